use crate::shared::region::Region;

/// Keeps the `k` largest regions by area, largest first.
///
/// The sort is stable, so regions of equal area stay in detector order.
/// Fewer than `k` inputs are all returned; `k = 0` returns nothing.
pub fn select_top_k(regions: &[Region], k: usize) -> Vec<Region> {
    let mut sorted = regions.to_vec();
    sorted.sort_by(|a, b| b.area().cmp(&a.area()));
    sorted.truncate(k);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::new(x, y, w, h)
    }

    #[test]
    fn test_two_largest_in_descending_order() {
        let regions = vec![
            region(10, 10, 50, 50),
            region(5, 5, 100, 100),
            region(0, 0, 20, 20),
        ];
        let selected = select_top_k(&regions, 2);
        assert_eq!(selected, vec![region(5, 5, 100, 100), region(10, 10, 50, 50)]);
        assert_eq!(selected[0].area(), 10_000);
        assert_eq!(selected[1].area(), 2_500);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn test_fewer_than_k_returns_all(#[case] count: usize) {
        let regions: Vec<Region> = (0..count as i32).map(|i| region(i, i, 10, 10)).collect();
        assert_eq!(select_top_k(&regions, 2), regions);
    }

    #[test]
    fn test_ties_keep_detector_order() {
        let regions = vec![
            region(0, 0, 10, 10),
            region(50, 0, 20, 5),
            region(90, 0, 5, 20),
        ];
        let selected = select_top_k(&regions, 2);
        assert_eq!(selected, vec![region(0, 0, 10, 10), region(50, 0, 20, 5)]);
    }

    #[test]
    fn test_k_zero_selects_nothing() {
        assert!(select_top_k(&[region(0, 0, 10, 10)], 0).is_empty());
    }

    #[test]
    fn test_input_is_not_reordered() {
        let regions = vec![region(0, 0, 1, 1), region(0, 0, 9, 9)];
        let _ = select_top_k(&regions, 1);
        assert_eq!(regions[0], region(0, 0, 1, 1));
    }

    #[rstest]
    #[case(vec![30, 10, 20, 50, 40], 2)]
    #[case(vec![5, 5, 5, 5], 2)]
    #[case(vec![1, 100], 2)]
    #[case(vec![7, 3, 9, 1, 4, 8], 3)]
    fn test_selected_dominate_rest(#[case] sides: Vec<i32>, #[case] k: usize) {
        let regions: Vec<Region> = sides.iter().map(|&s| region(0, 0, s, s)).collect();
        let selected = select_top_k(&regions, k);
        assert!(selected.len() <= k);

        let min_selected = selected.iter().map(Region::area).min().unwrap();
        let mut rest = regions.clone();
        for s in &selected {
            let pos = rest.iter().position(|r| r == s).unwrap();
            rest.remove(pos);
        }
        assert!(rest.iter().all(|r| r.area() <= min_selected));
    }
}
