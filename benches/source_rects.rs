use criterion::{black_box, criterion_group, criterion_main, Criterion};
use magnifier_plus::magnifier::geometry::{GeometryInput, Point, SourceRectTable};
use magnifier_plus::magnifier::sanitize_zoom_levels;

fn bench_recompute(c: &mut Criterion) {
    let levels = sanitize_zoom_levels(&[1.25, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0]);
    let mut table = SourceRectTable::default();
    let mut x = 0;
    c.bench_function("recompute_on_pointer_move", |b| {
        b.iter(|| {
            x = (x + 7) % 1920;
            let input = GeometryInput {
                zoom_area_size: 100,
                window: (400, 300),
                zoom_levels: &levels,
                center: Point::new(x, 540),
                offset: Point::new(-35, -35),
            };
            table.recompute(black_box(&input));
            black_box(table.rect_for_index(3));
        })
    });
}

criterion_group!(benches, bench_recompute);
criterion_main!(benches);
