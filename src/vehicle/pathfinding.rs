use crate::{LinkId, LinkSet};

/// Finds the shortest sequence of links leading from the end of `src` to the end of `dst`,
/// excluding `src` itself. Returns `None` if `dst` can't be reached.
pub(crate) fn find_route(src: LinkId, dst: LinkId, links: &LinkSet) -> Option<Vec<LinkId>> {
    let (route, _) = pathfinding::directed::dijkstra::dijkstra(
        &src,
        |id| successors(*id, links),
        |id| *id == dst,
    )?;
    Some(route.into_iter().skip(1).collect())
}

/// The links following a link, with the cost of travelling along them in mm.
fn successors(link_id: LinkId, links: &LinkSet) -> impl Iterator<Item = (LinkId, u64)> + '_ {
    links
        .get(link_id)
        .into_iter()
        .flat_map(|link| link.links_out())
        .map(move |id| (*id, (1000.0 * links[*id].length()) as u64))
}
