//! crates/berichtsheft_core/src/prompt.rs
//!
//! The prompt template sent to the text-improvement gateway. Prompt variants
//! are data: a different wording is a different `ImprovePrompt`, not new code.

use crate::ports::ImproveRequest;

const DEFAULT_SYSTEM_INSTRUCTIONS: &str = r#"Du schreibst Berichtshefte für einen IT-Auszubildenden.

ZIEL:
Der Text soll aussehen wie ein realistischer, knapp gehaltener Ausbildungsnachweis,
so wie ihn ein Azubi wirklich im Berichtsheft abgibt.

KEIN Aufsatz.
KEIN Schulbuchstil.
KEIN Behördendeutsch.

GRUNDSÄTZLICHER SCHREIBSTIL
- Kurz, sachlich und klar
- Einfach formuliert
- Nah an Stichpunkten
- Keine ausgeschmückten Sätze
- Keine Passivformen wie „wurde“, „wurden“, „es wurde“
- Keine erklärenden Zusatzsätze
- Keine Zusammenfassungen
- Keine Bewertungen
- Nichts dazudichten

BERUFSSCHULE (SEHR WICHTIG)
- KEIN Fließtext
- Struktur exakt beibehalten
- Tage, Fächer und Stunden unverändert lassen
- Reihenfolge unverändert lassen
- Inhalte NICHT umformulieren
- Nur Rechtschreibung und Grammatik korrigieren
- Stil bleibt stichpunktartig
- Keine Verbindungssätze zwischen Inhalten

ARBEIT
- Als sachlichen Fließtext schreiben
- Tätigkeiten logisch nacheinander beschreiben
- Leicht ausschreiben, aber knapp bleiben
- Keine Einleitung, kein Fazit
- Keine Wiederholungen
- Realistisch und bodenständig

FORM
- Keine Emojis
- Keine Sonderzeichen
- Keine Erklärungen
- Antworte ausschließlich mit dem fertigen Berichtstext"#;

/// One few-shot exchange: a raw entry and the finished text for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptExample {
    pub input: String,
    pub output: String,
}

impl PromptExample {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// A named system instruction plus few-shot examples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImprovePrompt {
    pub name: String,
    pub system: String,
    pub examples: Vec<PromptExample>,
}

impl ImprovePrompt {
    /// Builds the gateway request for one report's raw content.
    pub fn request<'a>(&'a self, raw_content: &'a str) -> ImproveRequest<'a> {
        ImproveRequest {
            system: &self.system,
            examples: &self.examples,
            input: raw_content,
        }
    }
}

impl Default for ImprovePrompt {
    fn default() -> Self {
        Self {
            name: "berichtsheft-de".to_string(),
            system: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
            examples: vec![
                PromptExample::new(
                    "Montag:\nEmails geprüft, Meeting mit Betreuer, Projektantrag bearbeitet\n\nDienstag:\nSoftware installiert, Datenbank getestet",
                    "Am Montag habe ich meine E-Mails überprüft. Anschließend fand ein Meeting mit meinem Betreuer statt, in dem wir den aktuellen Stand besprochen haben. Danach arbeitete ich weiter am Projektantrag.\nAm Dienstag installierte ich die benötigte Software und testete die Datenbankverbindung.",
                ),
                PromptExample::new(
                    "Montag:\nUrlaub\n\nDienstag:\nPC neu eingerichtet, Programme installiert",
                    "Am Montag hatte ich Urlaub.\nAm Dienstag richtete ich meinen Dienst-PC neu ein und installierte die benötigten Programme.",
                ),
                PromptExample::new(
                    "Montag:\n2h WiKo: Konjunkturzyklen\n4h BFKO: Raspberry Pi Projekt\n2h GK: EU Arbeit",
                    "Montag:\n2h WiKo: Konjunkturzyklen\n4h BFKO: Raspberry Pi Projekt\n2h GK: EU Arbeit",
                ),
            ],
        }
    }
}
