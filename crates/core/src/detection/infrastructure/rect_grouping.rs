use crate::shared::region::Region;

/// Clusters overlapping raw cascade hits into one rectangle per object.
///
/// Hits are partitioned into classes of mutually similar rectangles
/// (transitively), each class is averaged, classes with at most
/// `min_neighbors` members are dropped, and a class fully inside a
/// stronger one is dropped too. `min_neighbors == 0` returns the hits
/// unchanged.
pub fn group_rectangles(rects: &[Region], min_neighbors: usize, eps: f64) -> Vec<Region> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let labels = partition(rects, |a, b| similar(a, b, eps));
    let class_count = labels.iter().copied().max().map_or(0, |m| m + 1);

    let mut sums = vec![[0i64; 4]; class_count];
    let mut counts = vec![0usize; class_count];
    for (r, &label) in rects.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += r.x as i64;
        s[1] += r.y as i64;
        s[2] += r.width as i64;
        s[3] += r.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<Region> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let avg = |v: i64| (v as f64 / n as f64).round() as i32;
            Region::new(avg(s[0]), avg(s[1]), avg(s[2]), avg(s[3]))
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= min_neighbors {
            continue;
        }
        let swallowed = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= min_neighbors {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            r1.is_inside(r2, dx, dy) && (n2 > n1.max(3) || n1 < 3)
        });
        if !swallowed {
            grouped.push(*r1);
        }
    }
    grouped
}

/// Two hits are similar when every edge moves by at most
/// `eps * (min width + min height) / 2`.
fn similar(a: &Region, b: &Region, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: i32, q: i32| ((p - q) as f64).abs() <= delta;
    close(a.x, b.x) && close(a.y, b.y) && close(a.right(), b.right()) && close(a.bottom(), b.bottom())
}

/// Union-find over an equivalence predicate. Class labels are numbered
/// in order of first appearance.
fn partition<F>(items: &[Region], same: F) -> Vec<usize>
where
    F: Fn(&Region, &Region) -> bool,
{
    let mut parent: Vec<usize> = (0..items.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if same(&items[i], &items[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = ri.min(rj);
                }
            }
        }
    }

    let mut label_of_root = vec![usize::MAX; items.len()];
    let mut next = 0;
    (0..items.len())
        .map(|i| {
            let root = find(&mut parent, i);
            if label_of_root[root] == usize::MAX {
                label_of_root[root] = next;
                next += 1;
            }
            label_of_root[root]
        })
        .collect()
}
