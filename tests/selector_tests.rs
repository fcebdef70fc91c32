use approx::assert_relative_eq;
use timeline_core::{
    calculate_complete_character_influence, AnimatableProperty, ExpressionSelector, Keyframe,
    PropertyValue, RangeSelector, Selector, SelectorMode, SelectorShape, TextAnimator,
    WigglySelector,
};

fn scalar(name: &str, v: f64) -> AnimatableProperty {
    AnimatableProperty::new(name, PropertyValue::Scalar(v))
}

fn range(start: f64, end: f64, offset: f64, shape: SelectorShape) -> RangeSelector {
    RangeSelector {
        mode: SelectorMode::Add,
        shape,
        start: scalar("start", start),
        end: scalar("end", end),
        offset: scalar("offset", offset),
    }
}

fn influence_per_char(animator: &TextAnimator, total: usize, frame: f64) -> Vec<f64> {
    (0..total)
        .map(|i| calculate_complete_character_influence(animator, i, total, frame, 30.0))
        .collect()
}

#[test]
fn default_full_range_selects_all_characters() {
    let animator = TextAnimator::new(vec![Selector::Range(RangeSelector::full())]);
    for w in influence_per_char(&animator, 11, 0.0) {
        assert_relative_eq!(w, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn square_range_selects_the_window() {
    let animator = TextAnimator::new(vec![Selector::Range(range(
        0.0,
        50.0,
        0.0,
        SelectorShape::Square,
    ))]);
    // 11 characters at positions 0, 10, ..., 100.
    let weights = influence_per_char(&animator, 11, 0.0);
    for (i, w) in weights.iter().enumerate() {
        let expected = if i <= 5 { 1.0 } else { 0.0 };
        assert_relative_eq!(*w, expected, epsilon = 1e-9);
    }
}

#[test]
fn wraparound_range_selects_both_ends() {
    // Start 80, end 30: the window passes through 100 back to 0.
    let animator = TextAnimator::new(vec![Selector::Range(range(
        80.0,
        30.0,
        0.0,
        SelectorShape::Square,
    ))]);
    let weights = influence_per_char(&animator, 11, 0.0);
    assert_relative_eq!(weights[9], 1.0); // position 90
    assert_relative_eq!(weights[10], 1.0); // position 100
    assert_relative_eq!(weights[0], 1.0); // position 0
    assert_relative_eq!(weights[2], 1.0); // position 20
    assert_relative_eq!(weights[5], 0.0); // position 50
    assert_relative_eq!(weights[7], 0.0); // position 70
}

#[test]
fn single_character_sits_at_the_midpoint() {
    // With one character there is no span to divide: position is 50%.
    let left_half = TextAnimator::new(vec![Selector::Range(range(
        0.0,
        49.0,
        0.0,
        SelectorShape::Square,
    ))]);
    assert_relative_eq!(
        calculate_complete_character_influence(&left_half, 0, 1, 0.0, 30.0),
        0.0
    );
    let spanning = TextAnimator::new(vec![Selector::Range(range(
        40.0,
        60.0,
        0.0,
        SelectorShape::Square,
    ))]);
    assert_relative_eq!(
        calculate_complete_character_influence(&spanning, 0, 1, 0.0, 30.0),
        1.0
    );
}

#[test]
fn ramp_shape_grades_across_the_window() {
    let animator = TextAnimator::new(vec![Selector::Range(range(
        0.0,
        100.0,
        0.0,
        SelectorShape::RampUp,
    ))]);
    let weights = influence_per_char(&animator, 5, 0.0);
    assert_relative_eq!(weights[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(weights[2], 0.5, epsilon = 1e-9);
    assert_relative_eq!(weights[4], 1.0, epsilon = 1e-9);
}

#[test]
fn animated_offset_slides_the_window() {
    let offset = AnimatableProperty::animated(
        "offset",
        vec![
            Keyframe::new(0, PropertyValue::Scalar(0.0)),
            Keyframe::new(30, PropertyValue::Scalar(50.0)),
        ],
    );
    let selector = RangeSelector {
        mode: SelectorMode::Add,
        shape: SelectorShape::Square,
        start: scalar("start", 0.0),
        end: scalar("end", 40.0),
        offset,
    };
    let animator = TextAnimator::new(vec![Selector::Range(selector)]);
    // At frame 0 the window is [0, 40]; character at 50% is outside.
    assert_relative_eq!(
        calculate_complete_character_influence(&animator, 5, 11, 0.0, 30.0),
        0.0
    );
    // At frame 30 the window slides to [50, 90]; now it covers 50%.
    assert_relative_eq!(
        calculate_complete_character_influence(&animator, 5, 11, 30.0, 30.0),
        1.0
    );
}

#[test]
fn intersect_mode_multiplies_influences() {
    let animator = TextAnimator::new(vec![
        Selector::Range(range(0.0, 100.0, 0.0, SelectorShape::RampUp)),
        Selector::Range({
            let mut s = range(0.0, 100.0, 0.0, SelectorShape::RampUp);
            s.mode = SelectorMode::Intersect;
            s
        }),
    ]);
    // Midpoint: 0.5 * 0.5.
    assert_relative_eq!(
        calculate_complete_character_influence(&animator, 2, 5, 0.0, 30.0),
        0.25,
        epsilon = 1e-9
    );
}

#[test]
fn subtract_and_difference_modes_fold_in_order() {
    let full = |mode| {
        Selector::Range({
            let mut s = range(0.0, 100.0, 0.0, SelectorShape::Square);
            s.mode = mode;
            s
        })
    };
    let animator = TextAnimator::new(vec![full(SelectorMode::Add), full(SelectorMode::Subtract)]);
    assert_relative_eq!(
        calculate_complete_character_influence(&animator, 0, 2, 0.0, 30.0),
        0.0
    );
    let animator = TextAnimator::new(vec![full(SelectorMode::Add), full(SelectorMode::Difference)]);
    assert_relative_eq!(
        calculate_complete_character_influence(&animator, 0, 2, 0.0, 30.0),
        0.0
    );
}

#[test]
fn result_is_clamped_before_amount() {
    // Two full squares added give 2.0, clamped to 1.0, then halved.
    let mut animator = TextAnimator::new(vec![
        Selector::Range(range(0.0, 100.0, 0.0, SelectorShape::Square)),
        Selector::Range(range(0.0, 100.0, 0.0, SelectorShape::Square)),
    ]);
    animator.amount = 50.0;
    assert_relative_eq!(
        calculate_complete_character_influence(&animator, 0, 2, 0.0, 30.0),
        0.5,
        epsilon = 1e-9
    );
}

#[test]
fn wiggly_selector_is_frame_deterministic() {
    let animator = TextAnimator::new(vec![Selector::Wiggly(WigglySelector {
        mode: SelectorMode::Add,
        max_amount: 100.0,
        min_amount: 0.0,
        wiggles_per_second: 2.0,
        correlation: 25.0,
        seed: 11,
    })]);
    for frame in [0.0, 7.0, 13.5, 29.0] {
        let a = influence_per_char(&animator, 6, frame);
        let b = influence_per_char(&animator, 6, frame);
        assert_eq!(a, b, "frame {frame} not reproducible");
        for w in a {
            assert!((0.0..=1.0).contains(&w));
        }
    }
}

#[test]
fn expression_selector_sees_character_bindings() {
    let animator = TextAnimator::new(vec![Selector::Expression(ExpressionSelector {
        mode: SelectorMode::Add,
        source: "(textIndex - 1) / (textTotal - 1)".into(),
    })]);
    let weights = influence_per_char(&animator, 5, 0.0);
    for (i, w) in weights.iter().enumerate() {
        assert_relative_eq!(*w, i as f64 / 4.0, epsilon = 1e-9);
    }
}

#[test]
fn selector_value_carries_the_accumulated_influence() {
    let animator = TextAnimator::new(vec![
        Selector::Range(range(0.0, 100.0, 0.0, SelectorShape::RampUp)),
        Selector::Expression(ExpressionSelector {
            // Replace the accumulated value with its half.
            mode: SelectorMode::Intersect,
            source: "0.5".into(),
        }),
    ]);
    assert_relative_eq!(
        calculate_complete_character_influence(&animator, 4, 5, 0.0, 30.0),
        0.5,
        epsilon = 1e-9
    );
}
