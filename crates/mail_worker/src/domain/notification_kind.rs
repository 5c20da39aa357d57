use std::fmt;
use std::str::FromStr;

/// The four notification pipelines, each with its own failure ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// A resolution was created and its draft must be completed.
    PreDraft,
    /// A resolution was approved; voters learn when voting opens.
    ResolutionApproved,
    /// The notice period of an approved resolution is over.
    VotingStarts,
    /// A token offer was published.
    NewOffer,
}

impl NotificationKind {
    /// Sweep order used by the scheduled trigger.
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::PreDraft,
        NotificationKind::ResolutionApproved,
        NotificationKind::NewOffer,
        NotificationKind::VotingStarts,
    ];

    /// Key of the kind's failure ledger.
    pub fn ledger_key(&self) -> &'static str {
        match self {
            NotificationKind::PreDraft => "notEmailedResolutionIds",
            NotificationKind::ResolutionApproved => "notEmailedVotingResolutionIds",
            NotificationKind::VotingStarts => "notEmailedVotingStartResolutionIds",
            NotificationKind::NewOffer => "notEmailedOfferIds",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PreDraft => "created",
            NotificationKind::ResolutionApproved => "approved",
            NotificationKind::VotingStarts => "vote",
            NotificationKind::NewOffer => "offers",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown notification kind: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_route_names() {
        for kind in NotificationKind::ALL {
            assert_eq!(kind.as_str().parse::<NotificationKind>(), Ok(kind));
        }
        assert!("voting".parse::<NotificationKind>().is_err());
    }
}
