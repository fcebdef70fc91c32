use approx::assert_relative_eq;
use timeline_core::{
    bezier::bezier_ease_uncached, AnimatableProperty, BezierHandle, CurveCache, EvalContext,
    Interpolation, Keyframe, PropertyValue, BEZIER_CACHE_CAPACITY,
};

#[test]
fn cached_and_uncached_easing_agree() {
    let mut cache = CurveCache::new();
    let out = BezierHandle::new(5.0, 12.0);
    let inn = BezierHandle::new(-4.0, -6.0);
    for i in 0..=50 {
        let t = i as f64 / 50.0;
        assert_relative_eq!(
            cache.ease(t, &out, &inn, 20.0, 40.0),
            bezier_ease_uncached(t, &out, &inn, 20.0, 40.0),
            epsilon = 1e-12
        );
    }
    assert_eq!(cache.misses(), 1);
    assert_eq!(cache.hits(), 50);
}

#[test]
fn near_identical_parameters_share_an_entry() {
    // Differences below the 4-decimal rounding quantum key identically.
    let mut cache = CurveCache::new();
    cache.normalized(&BezierHandle::new(1.00001, 2.0), &BezierHandle::disabled(), 10.0, 5.0);
    cache.normalized(&BezierHandle::new(1.00004, 2.0), &BezierHandle::disabled(), 10.0, 5.0);
    assert_eq!(cache.len(), 1);
    // A difference above the quantum gets its own entry.
    cache.normalized(&BezierHandle::new(1.001, 2.0), &BezierHandle::disabled(), 10.0, 5.0);
    assert_eq!(cache.len(), 2);
}

#[test]
fn cache_evicts_least_recently_used_beyond_capacity() {
    let mut cache = CurveCache::new();
    for i in 0..(BEZIER_CACHE_CAPACITY + 100) {
        let out = BezierHandle::new(i as f64, 1.0);
        cache.normalized(&out, &BezierHandle::disabled(), 100.0, 1.0);
    }
    assert_eq!(cache.len(), BEZIER_CACHE_CAPACITY);
}

#[test]
fn repeated_evaluation_reuses_the_normalized_curve() {
    let mut ctx = EvalContext::new(30.0, 1.0);
    let mut prop = AnimatableProperty::animated(
        "x",
        vec![
            Keyframe::new(0, PropertyValue::Scalar(0.0))
                .with_handles(BezierHandle::new(8.0, 0.0), BezierHandle::disabled()),
            Keyframe::new(30, PropertyValue::Scalar(100.0))
                .with_handles(BezierHandle::disabled(), BezierHandle::new(-8.0, 0.0)),
        ],
    );
    prop.keyframes[0].interpolation = Interpolation::Bezier;

    for frame in 1..30 {
        ctx.evaluate(&prop, frame as f64);
    }
    let stats = ctx.cache_stats();
    assert_eq!(stats.bezier_entries, 1);
    assert_eq!(stats.bezier_misses, 1);
    assert_eq!(stats.bezier_hits, 28);
}

#[test]
fn eased_values_stay_inside_the_segment_range() {
    let mut ctx = EvalContext::new(30.0, 1.0);
    let mut prop = AnimatableProperty::animated(
        "x",
        vec![
            Keyframe::new(0, PropertyValue::Scalar(0.0))
                .with_handles(BezierHandle::new(10.0, 0.0), BezierHandle::disabled()),
            Keyframe::new(30, PropertyValue::Scalar(100.0))
                .with_handles(BezierHandle::disabled(), BezierHandle::new(-10.0, 0.0)),
        ],
    );
    prop.keyframes[0].interpolation = Interpolation::Bezier;
    let mut last = 0.0;
    for frame in 0..=30 {
        let v = ctx.evaluate(&prop, frame as f64).as_scalar().unwrap();
        assert!((0.0..=100.0).contains(&v), "escaped at frame {frame}: {v}");
        assert!(v >= last - 1e-6, "non-monotonic at frame {frame}");
        last = v;
    }
}
