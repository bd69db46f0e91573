//! Merging of overlapping raw detections.
//!
//! A real face triggers the cascade at many neighbouring positions and
//! scales. Hits are clustered with a relative-distance predicate, each
//! cluster is replaced by its average box, and clusters with too few members
//! are discarded. `min_neighbors` is the minimum number of *additional* hits a
//! cluster needs: a cluster survives with more than `min_neighbors` members.

use crate::pipeline::detect::DetectionBox;

/// Relative tolerance used when deciding whether two hits are the same face.
pub const GROUP_EPS: f64 = 0.2;

/// Cluster `rects`, average each cluster, and keep clusters with more than
/// `min_neighbors` members that are not swallowed by a stronger cluster.
///
/// `min_neighbors == 0` disables grouping and returns the input unchanged.
pub fn group_rectangles(
    rects: Vec<DetectionBox>,
    min_neighbors: u32,
    eps: f64,
) -> Vec<DetectionBox> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects;
    }

    let (labels, n_classes) = partition(&rects, |a, b| similar(a, b, eps));

    let mut sums = vec![[0i64; 4]; n_classes];
    let mut counts = vec![0u32; n_classes];
    for (r, &label) in rects.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += r.x as i64;
        s[1] += r.y as i64;
        s[2] += r.width as i64;
        s[3] += r.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<(Bounds, u32)> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let k = 1.0 / n as f64;
            let avg = |v: i64| (v as f64 * k).round() as i64;
            (
                Bounds {
                    x: avg(s[0]),
                    y: avg(s[1]),
                    w: avg(s[2]),
                    h: avg(s[3]),
                },
                n,
            )
        })
        .collect();

    let mut out = Vec::new();
    for (i, (r1, n1)) in averaged.iter().enumerate() {
        if *n1 <= min_neighbors {
            continue;
        }
        let swallowed = averaged.iter().enumerate().any(|(j, (r2, n2))| {
            if j == i || *n2 <= min_neighbors {
                return false;
            }
            let dx = (r2.w as f64 * eps).round() as i64;
            let dy = (r2.h as f64 * eps).round() as i64;
            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.x + r1.w <= r2.x + r2.w + dx
                && r1.y + r1.h <= r2.y + r2.h + dy
                && (*n2 > (*n1).max(3) || *n1 < 3)
        });
        if !swallowed {
            out.push(r1.to_box());
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
}

impl Bounds {
    fn to_box(self) -> DetectionBox {
        DetectionBox::new(
            self.x.max(0) as u32,
            self.y.max(0) as u32,
            self.w.max(0) as u32,
            self.h.max(0) as u32,
        )
    }
}

/// Two boxes are the same object when every edge moves by at most
/// `eps × (mean of the smaller width and smaller height)`.
fn similar(a: &DetectionBox, b: &DetectionBox, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) as f64 + a.height.min(b.height) as f64) * 0.5;
    let (ax, ay, aw, ah) = (a.x as f64, a.y as f64, a.width as f64, a.height as f64);
    let (bx, by, bw, bh) = (b.x as f64, b.y as f64, b.width as f64, b.height as f64);
    (ax - bx).abs() <= delta
        && (ay - by).abs() <= delta
        && (ax + aw - bx - bw).abs() <= delta
        && (ay + ah - by - bh).abs() <= delta
}

/// Union-find partition of `items` under the equivalence closure of `same`.
///
/// Class ids are assigned in order of first appearance.
fn partition<T>(items: &[T], same: impl Fn(&T, &T) -> bool) -> (Vec<usize>, usize) {
    let n = items.len();
    let mut parent: Vec<usize> = (0..n).collect();
    let mut rank = vec![0u8; n];

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if !same(&items[i], &items[j]) {
                continue;
            }
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri == rj {
                continue;
            }
            match rank[ri].cmp(&rank[rj]) {
                std::cmp::Ordering::Less => parent[ri] = rj,
                std::cmp::Ordering::Greater => parent[rj] = ri,
                std::cmp::Ordering::Equal => {
                    parent[rj] = ri;
                    rank[ri] += 1;
                }
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; n];
    let mut labels = Vec::with_capacity(n);
    let mut n_classes = 0;
    for i in 0..n {
        let root = find(&mut parent, i);
        if class_of_root[root] == usize::MAX {
            class_of_root[root] = n_classes;
            n_classes += 1;
        }
        labels.push(class_of_root[root]);
    }
    (labels, n_classes)
}
