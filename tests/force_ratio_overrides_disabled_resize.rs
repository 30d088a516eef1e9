use dictcore::{disable_resize, enable_resize, Dict};

/// Scenario 6: with resize disabled process-wide, growth stays suppressed
/// until the load factor exceeds `FORCE_RATIO` (5), at which point it
/// proceeds regardless.
#[test]
fn growth_stays_suppressed_until_force_ratio_then_proceeds() {
    disable_resize();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut d: Dict<Vec<u8>, u32> = Dict::new();
        // Fill past size 4 so it would normally grow; with resize disabled
        // and load factor at or under the force ratio (5), size must stay
        // put: 21 entries over 4 buckets is a load factor of 5.25, just
        // over the threshold checked on the *next* insert.
        for i in 0..21u32 {
            d.add(i.to_be_bytes().to_vec(), i).unwrap();
        }
        assert_eq!(d.get_stats().table0.size, 4, "voluntary growth must stay suppressed under the force ratio");

        // The load factor ahead of this insert (21/4 = 5.25) exceeds
        // FORCE_RATIO, so growth must proceed even with resize disabled.
        d.add(21u32.to_be_bytes().to_vec(), 21).unwrap();
        assert!(
            d.is_rehashing() || d.get_stats().table0.size > 4,
            "growth past the force ratio must proceed even with resize disabled"
        );
    }));
    enable_resize();
    result.unwrap();
}
