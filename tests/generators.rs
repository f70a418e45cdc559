use chess_dataset::generators::{
    load_test_suite, RandomBlackStates, RandomWhiteStates, StateActionBatches, Transitions,
};
use chess_dataset::{
    discounted_reward, Dataset, DatasetConfig, DatasetError, GeneratorKind, Outcome, TensorCache,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

const OPERA_GAME: &str = r#"[Event "Paris"]
[White "Morphy"]
[Black "Duke Karl / Count Isouard"]
[Result "1-0"]
[PlyCount "33"]

1. e4 e5 2. Nf3 d6 3. d4 Bg4 4. dxe5 Bxf3 5. Qxf3 dxe5 6. Bc4 Nf6 7. Qb3 Qe7
8. Nc3 c6 9. Bg5 b5 10. Nxb5 cxb5 11. Bxb5+ Nbd7 12. O-O-O Rd8 13. Rxd7 Rxd7
14. Rd1 Qe6 15. Bxd7+ Nxd7 16. Qb8+ Nxb8 17. Rd8# 1-0

"#;

const FORFEITED: &str = r#"[Event "Blitz"]
[Result "0-1"]

1. d4 d5 2. c4 e6 3. Nc3 Nf6 4. Bg5 Be7 5. e3 {White forfeits on time} 0-1

"#;

const DRAWN: &str = r#"[Result "1/2-1/2"]

1. Nf3 Nf6 2. g3 g6 3. Bg2 Bg7 4. O-O O-O 1/2-1/2

"#;

fn write_games(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn seeded(batch_size: usize) -> DatasetConfig {
    DatasetConfig {
        batch_size,
        seed: Some(17),
        ..Default::default()
    }
}

#[test]
fn forfeited_games_never_yield_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_games(&dir, "forfeit.pgn", FORFEITED);
    let config = seeded(1);

    assert_eq!(StateActionBatches::open(&path, &config, false).unwrap().count(), 0);
    assert_eq!(RandomWhiteStates::open(&path, &config, false).unwrap().count(), 0);
    assert_eq!(RandomBlackStates::open(&path, &config, false).unwrap().count(), 0);
    assert_eq!(Transitions::open(&path, &config).unwrap().count(), 0);
}

#[test]
fn batches_hold_exactly_batch_size_samples() {
    let dir = tempfile::tempdir().unwrap();
    // 17 white moves per game
    let path = write_games(&dir, "opera.pgn", &OPERA_GAME.repeat(4));
    let batches: Vec<_> = StateActionBatches::open(&path, &DatasetConfig::default(), true)
        .unwrap()
        .map(|b| b.unwrap())
        .collect();

    assert_eq!(batches.len(), 2);
    for batch in &batches {
        assert_eq!(batch.states.shape(), &[32, 27, 8, 8]);
        assert_eq!(batch.from.shape(), &[32, 64]);
        assert_eq!(batch.from.sum(), 32.0);
        assert_eq!(batch.to.sum(), 32.0);
    }
}

#[test]
fn black_reward_is_discounted_by_remaining_moves() {
    assert!((discounted_reward(Outcome::WhiteWin, 3, 0.99) - 0.970299).abs() < 1e-5);

    let dir = tempfile::tempdir().unwrap();
    let path = write_games(&dir, "opera.pgn", OPERA_GAME);
    for seed in 0..8 {
        let config = DatasetConfig {
            seed: Some(seed),
            ..Default::default()
        };
        let sample = RandomBlackStates::open(&path, &config, false)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(sample.ply % 2, 1);
        assert_eq!(sample.moves_remaining, (33 - sample.ply) / 2);
        let expected = 0.99f32.powi(sample.moves_remaining as i32);
        assert!((sample.reward - expected).abs() < 1e-6);
    }
}

#[test]
fn outcomes_map_to_white_values() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!("{}{}{}", OPERA_GAME, FORFEITED, DRAWN);
    let path = write_games(&dir, "mixed.pgn", &text);
    let outcomes: Vec<f32> = RandomWhiteStates::open(&path, &seeded(1), false)
        .unwrap()
        .map(|s| s.unwrap().outcome)
        .collect();
    assert_eq!(outcomes, vec![1.0, 0.0]);
}

#[test]
fn gzipped_games_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("games.pgn.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::default());
    encoder.write_all(format!("{}{}", OPERA_GAME, DRAWN).as_bytes()).unwrap();
    encoder.finish().unwrap();

    let transitions: Vec<_> = Transitions::open(&path, &seeded(1))
        .unwrap()
        .map(|t| t.unwrap())
        .collect();
    // 17 from the Opera game, 4 from the draw
    assert_eq!(transitions.len(), 21);
    assert_eq!(transitions.iter().filter(|t| t.new_game).count(), 2);
    assert_eq!(transitions[16].reward, 1.0);
    assert_eq!(transitions[20].reward, 0.0);
}

#[test]
fn looping_generator_rewinds() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_games(&dir, "drawn.pgn", DRAWN);
    let config = seeded(1).with_loop(true);
    let mut samples = RandomBlackStates::open(&path, &config, false).unwrap();
    for _ in 0..5 {
        assert_eq!(samples.next().unwrap().unwrap().reward, 0.0);
    }
    assert_eq!(samples.progress().total_seen, 1);
}

#[test]
fn dataset_cache_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_games(&dir, "opera.pgn", &OPERA_GAME.repeat(2));
    let dataset = Dataset::new(&path, seeded(8));

    let built = dataset.load(GeneratorKind::WhiteStateAction, false, false).unwrap();
    // 34 white moves fill 4 batches of 8
    assert_eq!(built.x.shape(), &[32, 12, 8, 8]);
    assert_eq!(built.y.shape(), &[32, 64]);

    let manifest = TensorCache::new(&path)
        .load_manifest("white_state_action_sl", false)
        .unwrap();
    assert_eq!(manifest.samples, 32);
    assert_eq!(manifest.y2_shape, Some(vec![32, 64]));

    let cached = dataset.load(GeneratorKind::WhiteStateAction, false, false).unwrap();
    assert_eq!(cached, built);
}

#[test]
fn strategic_suite_through_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let epd = concat!(
        "1kr5/3n4/q3p2p/p2n2p1/PppB1P2/5BP1/1P2Q2P/3R2K1 w - - bm f5; id \"STS.001\"; ",
        "c0 \"f5=10, Be5+=2, Bf2=3, Bg4=2\";\n",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - id \"start\"; c0 \"Nf3=9, e4=7\";\n",
    );
    let path = write_games(&dir, "suite.epd", epd);

    let suite = load_test_suite(&path, false).unwrap();
    assert_eq!(suite.len(), 2);
    assert_eq!(chess_dataset::best_move_kinds(&suite), [1, 1, 0, 0, 0, 0]);

    let set = Dataset::new(&path, DatasetConfig::default())
        .load(GeneratorKind::StrategicTestSuite, true, false)
        .unwrap();
    assert_eq!(set.x.shape(), &[2, 27, 8, 8]);
    assert_eq!(set.y.shape(), &[2, 6]);
}

#[test]
fn kingless_fen_header_skips_the_game() {
    let dir = tempfile::tempdir().unwrap();
    let broken = concat!(
        "[Result \"1-0\"]\n[SetUp \"1\"]\n[FEN \"8/8/8/8/8/8/4P3/8 w - - 0 1\"]\n\n",
        "1. e3 e6 2. e4 1-0\n\n"
    );
    let path = write_games(&dir, "setup.pgn", &format!("{}{}", broken, DRAWN));

    let mut samples = RandomWhiteStates::open(&path, &seeded(1), false).unwrap();
    let outcomes: Vec<f32> = samples.by_ref().map(|s| s.unwrap().outcome).collect();
    assert_eq!(outcomes, vec![0.0]);
    assert_eq!(samples.progress().malformed, 1);
}

#[test]
fn zero_batch_size_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_games(&dir, "opera.pgn", OPERA_GAME);
    let dataset = Dataset::new(&path, seeded(0).with_loop(true));

    assert!(matches!(
        dataset.state_action_batches(false),
        Err(DatasetError::Config(_))
    ));
    assert!(matches!(
        dataset.load(GeneratorKind::WhiteStateAction, false, true),
        Err(DatasetError::Config(_))
    ));
}
