use dictcore::Dict;
use std::collections::HashSet;

/// Scenario 3: starting a scan at cursor 0, completing one round-trip with a
/// growth interleaved between two calls, still visits every key present for
/// the whole scan.
#[test]
fn keys_present_for_whole_scan_are_all_emitted_across_a_growth() {
    let mut d: Dict<Vec<u8>, u32> = Dict::new();
    for i in 0..8u32 {
        d.add(i.to_be_bytes().to_vec(), i).unwrap();
    }

    let mut seen = HashSet::new();
    let mut cursor = d.scan(0, |k, _v| { seen.insert(k.clone()); }, |_| {});

    // Force growth mid-scan by inserting past the load-factor threshold.
    for i in 8..20u32 {
        d.add(i.to_be_bytes().to_vec(), i).unwrap();
    }
    assert!(d.get_stats().table0.size > 8 || d.is_rehashing());

    loop {
        cursor = d.scan(cursor, |k, _v| { seen.insert(k.clone()); }, |_| {});
        if cursor == 0 {
            break;
        }
    }

    for i in 0..8u32 {
        assert!(seen.contains(i.to_be_bytes().as_slice()), "missing key present for entire scan: {i}");
    }
}
