use archipelago_core::{
    Action, Heading, Position,
    agent::{Agent, AgentState, Explorer},
    crossing::{SelectionRule, select_next_island},
    environment::{ActionResult, Environment, Tile, load_environment_from_string},
    generator::{GeneratorConfig, generate_archipelago},
    islands::IslandMap,
    session::run_session,
    world::{Observation, WorldModel},
};

fn play(map: &str, max_turns: u64) -> (Environment, u64) {
    let mut environment = load_environment_from_string(map)
        .expect("valid map")
        .with_max_turns(max_turns);
    let mut explorer = Explorer::new();
    let turns = run_session(&mut explorer, &mut environment).expect("no engine error");
    (environment, turns)
}

fn assert_won(environment: &Environment) {
    assert_eq!(environment.outcome(), Some(&ActionResult::Win));
    assert_eq!(environment.position(), environment.start());
    assert!(environment.inventory().gold);
}

#[test]
fn brings_home_gold_from_the_starting_island() {
    let (environment, turns) = play(
        &[
            "*******",
            "*     *",
            "* ^   *",
            "*   $ *",
            "*******",
        ]
        .join("\n"),
        200,
    );
    assert_won(&environment);
    assert!(turns < 200);
}

#[test]
fn lays_a_stone_to_reach_the_gold() {
    let (environment, _) = play(
        &[
            "*********",
            "*   ~   *",
            "* ^o~ $ *",
            "*   ~   *",
            "*********",
        ]
        .join("\n"),
        500,
    );
    assert_won(&environment);
}

#[test]
fn rafts_out_and_back_for_the_gold() {
    // No stones anywhere: the way out needs the home tree, the way back
    // the tree next to the gold.
    let (environment, _) = play(
        &[
            "*********",
            "*   ~   *",
            "* ^a~ $ *",
            "* T ~ T *",
            "*********",
        ]
        .join("\n"),
        500,
    );
    assert_won(&environment);
    assert!(!environment.inventory().raft);
    assert_eq!(environment.terrain().iter().filter(|tile| **tile == Tile::Tree).count(), 0);
}

#[test]
fn wins_the_bundled_map() {
    let (environment, _) = play(include_str!("../../archipelago_tui/maps/map01.txt"), 1500);
    assert_won(&environment);
}

#[test]
fn generated_maps_never_raise_engine_errors() {
    for seed in 0..6 {
        let config = GeneratorConfig {
            seed,
            ..GeneratorConfig::default()
        };
        let mut environment = load_environment_from_string(&generate_archipelago(&config))
            .expect("generated map loads")
            .with_max_turns(3000);
        let mut explorer = Explorer::new();
        let turns = run_session(&mut explorer, &mut environment)
            .unwrap_or_else(|error| panic!("seed {seed}: {error}"));
        assert!(turns <= 3000, "seed {seed} played {turns} turns");
        assert!(environment.is_over());
    }
}

/// Two islands ten cells wide with three cells of water between them.
fn channel(right_bank: &str) -> Vec<String> {
    let mut rows = vec!["**********".to_string()];
    for row in 1..9 {
        let left = if row == 4 { "* ^" } else { "*  " };
        let right = if row == 4 { right_bank } else { "   *" };
        rows.push(format!("{left}~~~{right}"));
    }
    rows.push("**********".to_string());
    rows
}

#[test]
fn gold_across_a_wide_gap_needs_a_one_way_trip() {
    let map = WorldModel::from_rows(&channel(" $ *")).expect("valid map");
    let mut agent = map.agent();
    agent.stones = 2;

    // Two stones cannot bridge three cells and the far island has no tree.
    let islands = IslandMap::segment(&map.world, &agent);
    assert_eq!(select_next_island(&map.world, &agent, &islands), None);

    // With a raft the gold island is taken without a way back.
    agent.has_raft = true;
    let selection = select_next_island(&map.world, &agent, &islands).expect("island B");
    assert_eq!(selection.rule, SelectionRule::GoldByRaft);
    assert!(selection.route.raft_required);
    assert!(islands.get(selection.route.target).is_some_and(|island| island.has_gold));
}

#[test]
fn cuts_the_tree_ahead_for_a_raft() {
    let mut agent = AgentState::new(Position::new(0, 0), Heading::Up);
    agent.has_axe = true;
    let mut explorer = Explorer::from_parts(WorldModel::new(agent.position), agent);

    let view = Observation::from_rows(&["~~~~~", "~ T ~", "~ ^ ~", "~   ~", "~~~~~"])
        .expect("valid observation");
    assert_eq!(explorer.act(&view).expect("action"), Action::Cut);
    assert!(explorer.state().has_raft);
}

#[test]
fn sighted_gold_comes_before_closer_unknown_space() {
    let mut explorer = Explorer::new();
    // Unknown space starts just beyond the view ahead; the gold is behind.
    let view = Observation::from_rows(&["     ", "     ", "  ^  ", "     ", "  $  "])
        .expect("valid observation");
    let action = explorer.act(&view).expect("action");
    assert_eq!(explorer.state().seen_gold, Some(Position::new(0, 2)));
    assert_ne!(action, Action::Forward);
}
