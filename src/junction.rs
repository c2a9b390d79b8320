use crate::env::{ControlledLink, Lane};
use crate::LinkId;

/// A point where links merge, operated by merge control.
#[derive(Clone, Debug)]
pub struct Junction {
    /// The movements through the junction, from an incoming to an outgoing link.
    movements: Vec<(LinkId, LinkId)>,
}

impl Junction {
    /// Creates a junction from its movements.
    pub(crate) fn new(movements: &[(LinkId, LinkId)]) -> Self {
        Self {
            movements: movements.to_vec(),
        }
    }

    /// The junction's controlled-link table. Every link is a single lane.
    pub fn controlled_links(&self) -> Vec<ControlledLink<LinkId>> {
        self.movements
            .iter()
            .map(|(from, to)| ControlledLink {
                from: Lane::new(*from, 0),
                to: Lane::new(*to, 0),
            })
            .collect()
    }
}
