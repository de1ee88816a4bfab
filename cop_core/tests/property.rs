use cop_core::{Frame, HistoryWindow, parse};
use proptest::prelude::*;

fn decimal() -> impl Strategy<Value = f64> {
    (-5000i32..5000).prop_map(|cents| f64::from(cents) / 100.0)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn parse_never_panics(line in ".{0,64}") {
        let _ = parse(&line);
    }

    #[test]
    fn weight_lines_roundtrip_and_clamp(a in decimal(), b in decimal(), c in decimal(), d in decimal()) {
        let line = format!("{a:.2},{b:.2},{c:.2},{d:.2}");
        let Frame::Weights(w) = parse(&line) else {
            return Err(TestCaseError::fail(format!("not a weight frame: {line}")));
        };
        for (got, sent) in w.as_array().into_iter().zip([a, b, c, d]) {
            prop_assert!(got >= 0.0);
            let expected: f64 = format!("{sent:.2}").parse().unwrap();
            prop_assert_eq!(got, expected.max(0.0));
        }
    }

    #[test]
    fn cop_lines_keep_sign(x in decimal(), y in decimal()) {
        let line = format!("({x:.3}, {y:.3})");
        let expected_x: f64 = format!("{x:.3}").parse().unwrap();
        let expected_y: f64 = format!("{y:.3}").parse().unwrap();
        prop_assert_eq!(parse(&line), Frame::Cop { x: expected_x, y: expected_y });
    }

    #[test]
    fn text_lines_are_unrecognized_verbatim(line in "[a-zA-Z :]{1,40}") {
        prop_assert_eq!(parse(&line), Frame::Unrecognized { raw: line.clone() });
    }

    #[test]
    fn history_keeps_most_recent(cap in 1usize..32, n in 0usize..100) {
        let mut w = HistoryWindow::with_capacity(cap);
        let pushed: Vec<(f64, f64)> = (0..n).map(|i| (i as f64, -(i as f64))).collect();
        for p in &pushed {
            w.push(*p);
        }
        prop_assert_eq!(w.len(), n.min(cap));
        prop_assert_eq!(w.snapshot(), pushed[n.saturating_sub(cap)..].to_vec());
    }

    #[test]
    fn host_cop_stays_on_plate(a in 0.0f64..100.0, b in 0.0f64..100.0, c in 0.0f64..100.0, d in 0.0f64..100.0) {
        let w = cop_core::WeightReading { a, b, c, d };
        let (x, y) = w.center_of_pressure();
        prop_assert!((-1.0..=1.0).contains(&x));
        prop_assert!((-1.0..=1.0).contains(&y));
    }
}
