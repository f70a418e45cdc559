use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chess_dataset::encoding::{compact_state, featurize, state_planes, CompactEmpty};
use chess_dataset::{Board, GameRecord};

const MIDDLEGAME: &str = "r1bq1rk1/pp2bppp/2n1pn2/3p4/2PP4/2N1PN2/PP2BPPP/R2QKB1R w KQ - 0 9";

const OPERA_GAME: &str = "[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 d6 3. d4 Bg4 4. dxe5 Bxf3 \
5. Qxf3 dxe5 6. Bc4 Nf6 7. Qb3 Qe7 8. Nc3 c6 9. Bg5 b5 10. Nxb5 cxb5 11. Bxb5+ Nbd7 12. O-O-O Rd8 \
13. Rxd7 Rxd7 14. Rd1 Qe6 15. Bxd7+ Nxd7 16. Qb8+ Nxb8 17. Rd8# 1-0\n";

fn bench_state_planes(c: &mut Criterion) {
    let position = Board::from_fen(MIDDLEGAME).unwrap().position();
    c.bench_function("state_planes", |b| b.iter(|| state_planes(black_box(&position))));
}

fn bench_featurize(c: &mut Criterion) {
    let position = Board::from_fen(MIDDLEGAME).unwrap().position();
    c.bench_function("featurize_27_channels", |b| b.iter(|| featurize(black_box(&position))));
}

fn bench_compact_state(c: &mut Criterion) {
    let position = Board::from_fen(MIDDLEGAME).unwrap().position();
    c.bench_function("compact_state", |b| {
        b.iter(|| compact_state(black_box(&position), CompactEmpty::Sentinel))
    });
}

fn bench_replay(c: &mut Criterion) {
    let game: GameRecord = OPERA_GAME.parse().unwrap();
    c.bench_function("replay_opera_game", |b| {
        b.iter(|| black_box(&game).replay().unwrap().count())
    });
}

criterion_group!(
    benches,
    bench_state_planes,
    bench_featurize,
    bench_compact_state,
    bench_replay
);
criterion_main!(benches);
