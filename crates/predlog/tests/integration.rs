use predlog::{
    decode, encode, format_number, reconcile, row_key, ColumnLayout, Encoding, PredictionRecord,
    PredictionRow,
};
use rand::{seq::SliceRandom, Rng};

fn layout() -> ColumnLayout {
    ColumnLayout::new(
        vec!["bill_length_mm".into(), "flipper_length_mm".into()],
        vec!["Adelie".into(), "Chinstrap".into(), "Gentoo".into()],
    )
}

fn random_rows(n: usize) -> Vec<PredictionRow> {
    let mut rng = rand::thread_rng();
    let labels = ["Adelie", "Chinstrap", "Gentoo"];
    (0..n)
        .map(|i| {
            let winner = rng.gen_range(0..3);
            let mut probabilities: Vec<(String, f64)> =
                labels.iter().map(|l| (l.to_string(), 0.0)).collect();
            probabilities[winner].1 = 1.0;
            let record = PredictionRecord::new(
                vec![
                    ("bill_length_mm".into(), 30.0 + rng.gen_range(0..300) as f64 / 10.0),
                    ("flipper_length_mm".into(), 170.0 + rng.gen_range(0..60) as f64),
                ],
                labels[winner],
                probabilities,
                "v1.0",
                format!("2025-05-01 10:00:{:02}", i % 60),
            );
            PredictionRow::from_record(&record, &layout()).unwrap()
        })
        .collect()
}

#[test]
fn test_round_trip_both_encodings() {
    let rows = reconcile(&[], &random_rows(50)).rows;
    for enc in [Encoding::Csv, Encoding::Xlsx] {
        let bytes = encode(enc, &rows, &layout()).unwrap();
        assert_eq!(decode(enc, &bytes, &layout()).unwrap(), rows, "{enc:?}");
    }
}

#[test]
fn test_encodings_hold_the_same_row_set() {
    let rows = random_rows(20);
    let round_trip = |enc: Encoding| {
        decode(enc, &encode(enc, &rows, &layout()).unwrap(), &layout()).unwrap()
    };
    let csv = round_trip(Encoding::Csv);
    let xlsx = round_trip(Encoding::Xlsx);
    assert_eq!(csv, xlsx);
}

#[test]
fn test_reconcile_is_idempotent() {
    let a = random_rows(30);
    let b = random_rows(30);

    let once = reconcile(&a, &b);
    let twice = reconcile(&once.rows, &b);
    assert_eq!(twice.rows, once.rows);
    assert_eq!(twice.added, 0);
}

#[test]
fn test_reconcile_membership_ignores_incoming_order() {
    let a = random_rows(10);
    let b = random_rows(25);
    let mut shuffled = b.clone();
    shuffled.shuffle(&mut rand::thread_rng());

    let left = reconcile(&a, &b).rows;
    let right = reconcile(&a, &shuffled).rows;

    assert_eq!(left[..a.len()], right[..a.len()]);
    let mut lk: Vec<_> = left.iter().map(row_key).collect();
    let mut rk: Vec<_> = right.iter().map(row_key).collect();
    lk.sort();
    rk.sort();
    assert_eq!(lk, rk);
}

#[test]
fn test_duplicate_prediction_does_not_grow_csv() {
    let existing_csv = "\
bill_length_mm,flipper_length_mm,prediction,Adelie,Chinstrap,Gentoo,model_version,prediction_timestamp
39.1,181,Adelie,0.82,0.18,0.0,v1.0,2025-04-30 09:00:00
";
    let existing = decode(Encoding::Csv, existing_csv.as_bytes(), &layout()).unwrap();

    let record = PredictionRecord::new(
        vec![("bill_length_mm".into(), 39.1), ("flipper_length_mm".into(), 181.0)],
        "Adelie",
        vec![("Adelie".into(), 0.8181), ("Chinstrap".into(), 0.1818), ("Gentoo".into(), 0.0)],
        "v1.0",
        "2025-05-01 12:00:00",
    );
    let incoming = vec![PredictionRow::from_record(&record, &layout()).unwrap()];

    let r = reconcile(&existing, &incoming);
    assert_eq!(r.duplicates, 1);
    assert_eq!(r.rows.len(), 1);
}

#[test]
fn test_distinct_batch_rows_append_in_submission_order() {
    let existing = random_rows(3);
    let batch: Vec<PredictionRow> = [(50.0, 220.0), (35.5, 175.0)]
        .iter()
        .map(|&(bill, flipper)| {
            let record = PredictionRecord::new(
                vec![("bill_length_mm".into(), bill), ("flipper_length_mm".into(), flipper)],
                "Gentoo",
                vec![("Adelie".into(), 0.0), ("Chinstrap".into(), 0.0), ("Gentoo".into(), 1.0)],
                "v1.0",
                "2025-05-01 12:00:00",
            );
            PredictionRow::from_record(&record, &layout()).unwrap()
        })
        .collect();

    let r = reconcile(&existing, &batch);
    assert_eq!(r.added, 2);
    assert_eq!(r.rows[..3], existing[..]);
    assert_eq!(r.rows[3].features[0], format_number(50.0));
    assert_eq!(r.rows[4].features[0], format_number(35.5));
}
