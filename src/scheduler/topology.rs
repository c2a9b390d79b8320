use crate::env::{ControlledLink, EnvResult};
use itertools::Itertools;
use std::hash::Hash;

/// The approaches feeding into and out of an intersection.
#[derive(Clone, Debug, PartialEq)]
pub struct Topology<A> {
    /// The incoming approaches, in the order first seen in the link table.
    pub incoming: Vec<A>,
    /// The outgoing approaches, in the order first seen in the link table.
    pub outgoing: Vec<A>,
    /// The detection range, clamped to the incoming approach lengths.
    pub approach_range: f64,
}

impl<A: Copy + Eq + Hash> Topology<A> {
    /// Derives the approaches of an intersection from its controlled-link table.
    ///
    /// # Parameters
    /// * `links` - The controlled-link table
    /// * `approach_range` - The desired detection range in m
    /// * `approach_length` - Looks up the physical length of an approach
    pub fn resolve(
        links: &[ControlledLink<A>],
        approach_range: f64,
        mut approach_length: impl FnMut(A) -> EnvResult<f64>,
    ) -> EnvResult<Self> {
        let incoming = links
            .iter()
            .map(|link| link.from.approach)
            .unique()
            .collect::<Vec<_>>();
        let outgoing = links
            .iter()
            .map(|link| link.to.approach)
            .unique()
            .collect::<Vec<_>>();

        // Detection can't reach further back than the approach itself
        let mut range = approach_range;
        for approach in &incoming {
            let length = approach_length(*approach)?;
            if length < range {
                range = length.floor();
            }
        }

        Ok(Self {
            incoming,
            outgoing,
            approach_range: range,
        })
    }
}

#[cfg(test)]
mod test {
    use super::Topology;
    use crate::env::{ControlledLink, EnvError, Lane};

    fn link(from: &'static str, to: &'static str) -> ControlledLink<&'static str> {
        ControlledLink {
            from: Lane::new(from, 0),
            to: Lane::new(to, 0),
        }
    }

    #[test]
    fn deduplicates_approaches() {
        let links = [
            link("west", "east"),
            ControlledLink {
                from: Lane::new("west", 1),
                to: Lane::new("east", 1),
            },
            link("south", "east"),
        ];
        let topology = Topology::resolve(&links, 200.0, |_| Ok(500.0)).unwrap();
        assert_eq!(topology.incoming, ["west", "south"]);
        assert_eq!(topology.outgoing, ["east"]);
        assert_eq!(topology.approach_range, 200.0);
    }

    #[test]
    fn clamps_range_to_shortest_approach() {
        let links = [link("west", "east"), link("south", "east")];
        let topology = Topology::resolve(&links, 200.0, |a| {
            Ok(match a {
                "west" => 150.7,
                _ => 180.2,
            })
        })
        .unwrap();
        assert_eq!(topology.approach_range, 150.0);
    }

    #[test]
    fn propagates_lookup_failures() {
        let links = [link("west", "east")];
        let result = Topology::resolve(&links, 200.0, |a| Err(EnvError::unknown_approach(a)));
        assert!(matches!(result, Err(EnvError::UnknownApproach(_))));
    }
}
