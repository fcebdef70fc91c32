use approx::assert_relative_eq;
use timeline_core::{
    morph_paths, prepare_morph_paths, AnimatableProperty, BezierPath, EvalContext, Keyframe,
    MatchStrategy, MorphConfig, PropertyValue,
};

fn triangle() -> BezierPath {
    BezierPath::closed_from_points(&[(0.0, 0.0), (10.0, 0.0), (5.0, 8.0)])
}

fn square() -> BezierPath {
    BezierPath::closed_from_points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
}

#[test]
fn morph_endpoints_are_exact_clones() {
    let source = triangle();
    let target = square();
    let prepared = prepare_morph_paths(&source, &target, &MorphConfig::default());
    assert_eq!(morph_paths(&prepared.source, &prepared.target, 0.0), prepared.source);
    assert_eq!(morph_paths(&prepared.source, &prepared.target, 1.0), prepared.target);
    assert_eq!(morph_paths(&prepared.source, &prepared.target, -0.5), prepared.source);
    assert_eq!(morph_paths(&prepared.source, &prepared.target, 1.5), prepared.target);
}

#[test]
fn identical_paths_morph_to_themselves() {
    let path = square();
    let prepared = prepare_morph_paths(&path, &path, &MorphConfig::default());
    for t in [0.0, 0.3, 0.5, 0.8, 1.0] {
        let out = morph_paths(&prepared.source, &prepared.target, t);
        assert_eq!(out.vertex_count(), path.vertex_count());
        for (a, b) in out.vertices.iter().zip(prepared.source.vertices.iter()) {
            assert_relative_eq!(a.point.x, b.point.x, epsilon = 1e-9);
            assert_relative_eq!(a.point.y, b.point.y, epsilon = 1e-9);
        }
    }
}

#[test]
fn subdivide_shorter_matches_vertex_counts() {
    let prepared = prepare_morph_paths(&triangle(), &square(), &MorphConfig::default());
    assert_eq!(prepared.source.vertex_count(), 4);
    assert_eq!(prepared.target.vertex_count(), 4);
}

#[test]
fn resample_strategy_honors_requested_count() {
    let config = MorphConfig {
        strategy: MatchStrategy::Resample,
        resample_count: Some(12),
    };
    let prepared = prepare_morph_paths(&triangle(), &square(), &config);
    assert_eq!(prepared.source.vertex_count(), 12);
    assert_eq!(prepared.target.vertex_count(), 12);
}

#[test]
fn mismatched_counts_truncate_instead_of_failing() {
    // Bypassing preparation feeds mismatched paths straight to the blender.
    let source = triangle();
    let target = square();
    let out = morph_paths(&source, &target, 0.5);
    assert_eq!(out.vertex_count(), 3);
}

#[test]
fn midpoint_morph_blends_positions() {
    let source = BezierPath::from_points(&[(0.0, 0.0), (10.0, 0.0)]);
    let target = BezierPath::from_points(&[(0.0, 10.0), (10.0, 10.0)]);
    let prepared = prepare_morph_paths(&source, &target, &MorphConfig::default());
    let mid = morph_paths(&prepared.source, &prepared.target, 0.5);
    for vertex in &mid.vertices {
        assert_relative_eq!(vertex.point.y, 5.0, epsilon = 1e-9);
    }
}

#[test]
fn path_keyframes_morph_through_the_pipeline() {
    let mut ctx = EvalContext::new(30.0, 1.0);
    let prop = AnimatableProperty::animated(
        "shape",
        vec![
            Keyframe::new(0, PropertyValue::Path(triangle())),
            Keyframe::new(30, PropertyValue::Path(square())),
        ],
    );
    let start = ctx.evaluate(&prop, 0.0);
    let end = ctx.evaluate(&prop, 30.0);
    assert_eq!(start, PropertyValue::Path(triangle()));
    assert_eq!(end, PropertyValue::Path(square()));
    match ctx.evaluate(&prop, 15.0) {
        PropertyValue::Path(path) => {
            assert_eq!(path.vertex_count(), 4);
            assert!(path.closed);
        }
        other => panic!("expected a path, got {other:?}"),
    }
}

#[test]
fn morph_cache_hits_on_repeated_pairs() {
    let mut ctx = EvalContext::new(30.0, 1.0);
    let prop = AnimatableProperty::animated(
        "shape",
        vec![
            Keyframe::new(0, PropertyValue::Path(triangle())),
            Keyframe::new(30, PropertyValue::Path(square())),
        ],
    );
    for frame in 1..30 {
        ctx.evaluate(&prop, frame as f64);
    }
    let stats = ctx.cache_stats();
    assert_eq!(stats.morph_misses, 1);
    assert_eq!(stats.morph_hits, 28);
    ctx.clear_path_morph_cache();
    assert_eq!(ctx.cache_stats().morph_entries, 0);
}

#[test]
fn correspondence_avoids_gratuitous_rotation() {
    // A square morphed to a slightly offset square should pair vertices
    // nearly in place rather than rotating the ring.
    let source = square();
    let target =
        BezierPath::closed_from_points(&[(1.0, 0.5), (11.0, 0.5), (11.0, 10.5), (1.0, 10.5)]);
    let prepared = prepare_morph_paths(&source, &target, &MorphConfig::default());
    for (a, b) in prepared
        .source
        .vertices
        .iter()
        .zip(prepared.target.vertices.iter())
    {
        let d = ((a.point.x - b.point.x).powi(2) + (a.point.y - b.point.y).powi(2)).sqrt();
        assert!(d < 3.0, "vertex drifted {d} under correspondence");
    }
}
