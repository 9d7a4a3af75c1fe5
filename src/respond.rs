//! Inbound query responder — "who is on duty?" over chat.
//!
//! A message addressed to the bot (`<@BOTID> …`) is matched against
//! per-rota shorthands built from the rota id and name: "rc" or
//! "release coordinator" hit the RC rota, "bh"/"bughat"/"bug hat" hit
//! Bug Hat. Anything else gets a generic "didn't understand" reply —
//! no error details leak into the channel.

use regex::Regex;
use rotabot_core::types::Rota;

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// "Who is on duty for this rota?"
    WhoIsOnDuty { rota_id: String },
    /// Addressed to the bot but not understood.
    Unrecognized,
}

pub struct Responder {
    mention_prefix: String,
    matchers: Vec<(String, Regex)>,
}

impl Responder {
    pub fn new(bot_user_id: &str, rotas: &[Rota]) -> Self {
        let matchers = rotas
            .iter()
            .filter_map(|rota| {
                let pattern = rota_pattern(rota);
                match Regex::new(&pattern) {
                    Ok(re) => Some((rota.id.clone(), re)),
                    Err(e) => {
                        tracing::warn!("bad query pattern for rota {}: {e}", rota.id);
                        None
                    }
                }
            })
            .collect();
        Self {
            mention_prefix: format!("<@{bot_user_id}>"),
            matchers,
        }
    }

    /// Interpret a message. `None` means the message was not addressed
    /// to the bot and must be ignored entirely.
    pub fn parse(&self, text: &str) -> Option<Query> {
        let rest = text.trim().strip_prefix(&self.mention_prefix)?;
        let rest = rest.trim().trim_end_matches(['?', '!', '.']).trim();

        for (rota_id, re) in &self.matchers {
            if re.is_match(rest) {
                return Some(Query::WhoIsOnDuty {
                    rota_id: rota_id.clone(),
                });
            }
        }
        Some(Query::Unrecognized)
    }
}

/// Case-insensitive whole-word match on the rota id, the initials of
/// the name, or the name itself with flexible spacing ("bug hat",
/// "bughat").
fn rota_pattern(rota: &Rota) -> String {
    let mut alternatives = vec![regex::escape(&rota.id)];

    let words: Vec<&str> = rota.name.split_whitespace().collect();
    if words.len() > 1 {
        let initials: String = words
            .iter()
            .filter_map(|w| w.chars().next())
            .collect();
        alternatives.push(regex::escape(&initials));
        alternatives.push(
            words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join(r"\s?"),
        );
    } else if !rota.name.is_empty() {
        alternatives.push(regex::escape(&rota.name));
    }

    format!(r"(?i)\b({})\b", alternatives.join("|"))
}

/// The generic fallback reply.
pub const DIDNT_UNDERSTAND: &str = "I didn't quite get that, please try again.";

/// The generic degraded reply when resolution fails.
pub const RESOLVE_FAILED: &str = "Sorry, I can't look that up right now.";

#[cfg(test)]
mod tests {
    use super::*;
    use rotabot_core::types::AlertSchedule;

    fn rotas() -> Vec<Rota> {
        let alert = AlertSchedule {
            expression: "@every 1h".into(),
            message: "m".into(),
        };
        vec![
            Rota {
                id: "RC".into(),
                name: "Release Coordinator".into(),
                duty_duration: "P1D".into(),
                participants: vec!["sc".into()],
                alert: alert.clone(),
            },
            Rota {
                id: "BH".into(),
                name: "Bug Hat".into(),
                duty_duration: "P1D".into(),
                participants: vec!["sc".into()],
                alert,
            },
        ]
    }

    fn responder() -> Responder {
        Responder::new("UBOT", &rotas())
    }

    #[test]
    fn test_ignores_messages_not_addressed_to_bot() {
        assert_eq!(responder().parse("who is rc?"), None);
        assert_eq!(responder().parse("<@UOTHER> rc?"), None);
    }

    #[test]
    fn test_rota_id_shorthand() {
        assert_eq!(
            responder().parse("<@UBOT> rc?"),
            Some(Query::WhoIsOnDuty {
                rota_id: "RC".into()
            })
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            responder().parse("<@UBOT> who is RC"),
            Some(Query::WhoIsOnDuty {
                rota_id: "RC".into()
            })
        );
    }

    #[test]
    fn test_name_with_and_without_space() {
        let r = responder();
        let expected = Some(Query::WhoIsOnDuty {
            rota_id: "BH".into(),
        });
        assert_eq!(r.parse("<@UBOT> bug hat?"), expected);
        assert_eq!(r.parse("<@UBOT> bughat?"), expected);
        assert_eq!(r.parse("<@UBOT> bh?"), expected);
    }

    #[test]
    fn test_full_name_matches() {
        assert_eq!(
            responder().parse("<@UBOT> who is release coordinator today"),
            Some(Query::WhoIsOnDuty {
                rota_id: "RC".into()
            })
        );
    }

    #[test]
    fn test_unrecognized_query() {
        assert_eq!(
            responder().parse("<@UBOT> make me a sandwich"),
            Some(Query::Unrecognized)
        );
    }

    #[test]
    fn test_shorthand_must_be_whole_word() {
        // "arch" contains no standalone rota shorthand
        assert_eq!(
            responder().parse("<@UBOT> search the arch"),
            Some(Query::Unrecognized)
        );
    }
}
