use std::collections::HashMap;

use illusion::config::AppConfig;
use illusion::experiment::session::{Phase, Session, SessionEvent, Transition};
use illusion::experiment::trials::{
    BlockSpec, Counterbalance, TrialDescriptor, combinations, shuffled_series,
};
use illusion::experiment::variables::{DefaultLevels, LevelTables, Variable};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn crossed_block_repeats_every_cell_reps_times() {
    let tables = LevelTables::default();
    let fixed = DefaultLevels::default().resolve(&tables).unwrap();
    let spec = BlockSpec {
        vary: vec![Variable::LineLength, Variable::StimPeriod, Variable::LineLength],
    };
    let combos = combinations(&spec.varied(), &tables, fixed);
    assert_eq!(combos.len(), 25);

    let mut rng = StdRng::seed_from_u64(11);
    let trials = shuffled_series(&combos, 4, &mut rng);
    assert_eq!(trials.len(), 100);

    let mut counts: HashMap<TrialDescriptor, usize> = HashMap::new();
    for t in &trials {
        *counts.entry(*t).or_default() += 1;
        assert_eq!(t.level(Variable::LineAngle), fixed[Variable::LineAngle.index()]);
        assert_eq!(t.level(Variable::StimRadius), fixed[Variable::StimRadius.index()]);
    }
    assert_eq!(counts.len(), 25);
    assert!(counts.values().all(|&n| n == 4));

    for w in trials.chunks(25).collect::<Vec<_>>().windows(2) {
        assert_ne!(w[0][24], w[1][0], "repeat across series boundary");
    }
}

#[test]
fn every_seed_avoids_boundary_repeats() {
    let tables = LevelTables {
        line_angle: vec![20, 40],
        ..LevelTables::default()
    };
    let combos = combinations(&[Variable::LineAngle], &tables, [0; 4]);
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let trials = shuffled_series(&combos, 6, &mut rng);
        for pair in trials.chunks(2).collect::<Vec<_>>().windows(2) {
            assert_ne!(pair[0][1], pair[1][0], "seed {seed}");
        }
    }
}

#[test]
fn rotation_changes_the_first_block_per_participant() {
    let mut cfg = AppConfig::default();
    cfg.design.blocks = vec![
        vec![Variable::LineLength],
        vec![Variable::LineAngle],
        vec![Variable::StimRadius],
    ];
    cfg.design.counterbalance = Counterbalance::Rotate;

    let first_block = |participant: usize| {
        let mut s = Session::new(&cfg, participant, StdRng::seed_from_u64(0)).unwrap();
        s.handle(SessionEvent::WarningAnswered(true));
        assert_eq!(
            s.handle(SessionEvent::InitialsSubmitted("ab".into())),
            Transition::Advanced(Phase::Intro { block: 0 })
        );
        s.blocks()[0].varied()
    };
    assert_eq!(first_block(0), vec![Variable::LineLength]);
    assert_eq!(first_block(1), vec![Variable::LineAngle]);
    assert_eq!(first_block(5), vec![Variable::StimRadius]);

    cfg.design.counterbalance = Counterbalance::Fixed;
    let s = Session::new(&cfg, 2, StdRng::seed_from_u64(0)).unwrap();
    assert_eq!(s.blocks()[0].varied(), vec![Variable::LineLength]);
}
