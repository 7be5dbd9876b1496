use serde::Serialize;

/// Lifecycle of one alert instance. `Inactive` only exists for the single
/// tick after a firing alert stops matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AlertState {
    Pending {
        active_since_ms: i64,
    },
    Firing {
        active_since_ms: i64,
        fired_at_ms: i64,
    },
    Inactive {
        active_since_ms: i64,
        resolved_at_ms: i64,
    },
}

impl AlertState {
    pub fn start(now_ms: i64, for_ms: i64) -> Self {
        if for_ms <= 0 {
            Self::Firing {
                active_since_ms: now_ms,
                fired_at_ms: now_ms,
            }
        } else {
            Self::Pending {
                active_since_ms: now_ms,
            }
        }
    }

    pub fn observe(self, now_ms: i64, for_ms: i64) -> Self {
        match self {
            Self::Pending { active_since_ms } => {
                if now_ms - active_since_ms >= for_ms {
                    Self::Firing {
                        active_since_ms,
                        fired_at_ms: now_ms,
                    }
                } else {
                    Self::Pending { active_since_ms }
                }
            }
            Self::Firing { .. } => self,
            Self::Inactive { .. } => Self::start(now_ms, for_ms),
        }
    }

    pub fn vanish(self, now_ms: i64) -> Option<Self> {
        match self {
            Self::Firing {
                active_since_ms, ..
            } => Some(Self::Inactive {
                active_since_ms,
                resolved_at_ms: now_ms,
            }),
            Self::Pending { .. } | Self::Inactive { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Firing { .. } => "firing",
            Self::Inactive { .. } => "inactive",
        }
    }

    pub fn active_since_ms(&self) -> i64 {
        match *self {
            Self::Pending { active_since_ms }
            | Self::Firing {
                active_since_ms, ..
            }
            | Self::Inactive {
                active_since_ms, ..
            } => active_since_ms,
        }
    }

    pub fn fired_at_ms(&self) -> Option<i64> {
        match *self {
            Self::Firing { fired_at_ms, .. } => Some(fired_at_ms),
            _ => None,
        }
    }

    pub fn resolved_at_ms(&self) -> Option<i64> {
        match *self {
            Self::Inactive { resolved_at_ms, .. } => Some(resolved_at_ms),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_firing(&self) -> bool {
        matches!(self, Self::Firing { .. })
    }

    pub fn is_inactive(&self) -> bool {
        matches!(self, Self::Inactive { .. })
    }

    pub fn same_phase(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_without_for_fires_immediately() {
        let s = AlertState::start(1000, 0);
        assert!(s.is_firing());
        assert_eq!(s.active_since_ms(), 1000);
    }

    #[test]
    fn start_with_for_is_pending() {
        let s = AlertState::start(1000, 5000);
        assert_eq!(s, AlertState::Pending { active_since_ms: 1000 });
    }

    #[test]
    fn pending_waits_for_full_duration() {
        let s = AlertState::Pending { active_since_ms: 1000 };
        assert!(s.observe(5999, 5000).is_pending());
        let fired = s.observe(6000, 5000);
        assert_eq!(
            fired,
            AlertState::Firing {
                active_since_ms: 1000,
                fired_at_ms: 6000
            }
        );
    }

    #[test]
    fn firing_stays_firing() {
        let s = AlertState::Firing {
            active_since_ms: 1000,
            fired_at_ms: 6000,
        };
        assert_eq!(s.observe(9000, 5000), s);
    }

    #[test]
    fn firing_resolves_on_vanish() {
        let s = AlertState::Firing {
            active_since_ms: 1000,
            fired_at_ms: 6000,
        };
        let resolved = s.vanish(7000).unwrap();
        assert_eq!(resolved.resolved_at_ms(), Some(7000));
        assert_eq!(resolved.active_since_ms(), 1000);
    }

    #[test]
    fn pending_and_inactive_are_dropped_on_vanish() {
        assert_eq!(AlertState::Pending { active_since_ms: 1 }.vanish(2), None);
        assert_eq!(
            AlertState::Inactive {
                active_since_ms: 1,
                resolved_at_ms: 2
            }
            .vanish(3),
            None
        );
    }

    #[test]
    fn inactive_restarts_when_matched_again() {
        let s = AlertState::Inactive {
            active_since_ms: 1000,
            resolved_at_ms: 7000,
        };
        assert_eq!(s.observe(8000, 5000), AlertState::Pending { active_since_ms: 8000 });
    }
}
