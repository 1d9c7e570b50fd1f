use std::collections::HashSet;

use archipelago_core::{
    Position,
    islands::{IslandId, IslandMap},
    pathfinding::find_nearest_port,
    world::{Cell, WorldModel},
};

/// Fewest water cells on any simple path from `from` over water to a cell
/// of `target`, by trying every path.
fn fewest_stones(
    world: &WorldModel,
    islands: &IslandMap,
    from: Position,
    target: IslandId,
    visited: &mut HashSet<Position>,
    crossed: u32,
) -> Option<u32> {
    let mut best: Option<u32> = None;
    for neighbor in from.neighbors() {
        if visited.contains(&neighbor) {
            continue;
        }
        let found = if islands.island_of(neighbor) == Some(target) {
            Some(crossed)
        } else if world.cell(neighbor) == Cell::Water {
            visited.insert(neighbor);
            let found = fewest_stones(world, islands, neighbor, target, visited, crossed + 1);
            visited.remove(&neighbor);
            found
        } else {
            None
        };
        if let Some(found) = found {
            best = Some(best.map_or(found, |best| best.min(found)));
        }
    }
    best
}

fn check_minimal(rows: &[&str]) {
    let map = WorldModel::from_rows(rows).expect("valid map");
    let agent = map.agent();
    let islands = IslandMap::segment(&map.world, &agent);
    let sources = islands.ports(0, &map.world);
    assert!(!sources.is_empty(), "home island has no port");

    let targets: Vec<IslandId> = islands
        .islands()
        .iter()
        .skip(1)
        .filter(|island| !island.is_water)
        .map(|island| island.id)
        .collect();
    assert!(!targets.is_empty(), "no island to reach");

    for target in targets {
        let mut overall: Option<u32> = None;
        for source in &sources {
            let mut visited = HashSet::from([*source]);
            let exhaustive = fewest_stones(&map.world, &islands, *source, target, &mut visited, 0);
            let route = find_nearest_port(&map.world, &islands, &[*source], target);
            assert_eq!(
                route.map(|route| route.stones),
                exhaustive,
                "from {source:?} to island {target}"
            );
            if let Some(found) = exhaustive {
                overall = Some(overall.map_or(found, |best| best.min(found)));
            }
        }

        let route = find_nearest_port(&map.world, &islands, &sources, target);
        assert_eq!(route.map(|route| route.stones), overall);
        if let Some(route) = route {
            assert!(sources.contains(&route.home_port));
            assert_eq!(islands.island_of(route.island_port), Some(target));
        }
    }
}

#[test]
fn nearest_port_across_an_open_lagoon() {
    check_minimal(&[
        "********",
        "*^ ~~~ *",
        "*  ~*~ *",
        "* ~~~~ *",
        "********",
    ]);
}

#[test]
fn nearest_port_around_a_reef() {
    check_minimal(&[
        "*******",
        "*^~~~ *",
        "* ~**~*",
        "*~~~~ *",
        "* ~~~ *",
        "*******",
    ]);
}

#[test]
fn nearest_port_with_two_islands() {
    check_minimal(&[
        "********",
        "* ~~ ~ *",
        "*^~~~~~*",
        "*~~ ~~ *",
        "********",
    ]);
}
