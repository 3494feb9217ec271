use criterion::{criterion_group, criterion_main, Criterion};
use dyn_stack::*;
use faer::{
    col::Col,
    linalg::qr::no_pivoting::compute::{qr_in_place, qr_in_place_req},
    Mat, Parallelism,
};
use faer_team::{
    form_q, gemv, ApplyPivot, Direction, ExecSpace, FormQParams, PivotList, Side, Team,
};
use rand::random;

fn teams() -> Vec<(&'static str, Team)> {
    let mut teams = vec![("st", Team::serial())];
    #[cfg(feature = "rayon")]
    teams.push(("mt", Team::new(4).unwrap()));
    teams
}

pub fn pivot(c: &mut Criterion) {
    for n in [32, 128, 512, 2048] {
        let mut mat = Mat::from_fn(n, n, |_, _| random::<f64>());
        let pivots = (0..n)
            .map(|i| (random::<usize>() % (n - i)) as i32)
            .collect::<Vec<_>>();

        for (name, team) in teams() {
            for (side, side_name) in [(Side::Left, "rows"), (Side::Right, "cols")] {
                let apply = ApplyPivot::new(side, Direction::Forward);
                c.bench_function(&format!("pivot-{name}-{side_name}-{n}x{n}"), |b| {
                    b.iter(|| {
                        apply.list(&team, PivotList::from_slice(&pivots), mat.as_mut());
                    })
                });
            }
        }
    }
}

pub fn q_formation(c: &mut Criterion) {
    for (m, n) in [(8, 8), (32, 32), (128, 128), (512, 512), (1024, 128)] {
        let mut qr = Mat::from_fn(m, n, |_, _| random::<f64>());
        let k = m.min(n);
        let mut householder = Mat::<f64>::zeros(1, k);
        qr_in_place(
            qr.as_mut(),
            householder.as_mut(),
            Parallelism::None,
            PodStack::new(&mut GlobalPodBuffer::new(
                qr_in_place_req::<f64>(m, n, 1, Parallelism::None, Default::default()).unwrap(),
            )),
            Default::default(),
        );
        let tau = Col::from_fn(k, |j| 1.0 / householder.read(0, j));

        let mut q = Mat::<f64>::zeros(m, k);
        let mut work = Col::<f64>::zeros(k);

        for (space, space_name) in [(ExecSpace::Host, "host"), (ExecSpace::Device, "portable")] {
            for (name, team) in teams() {
                let team = team.with_space(space);
                c.bench_function(&format!("form-q-{name}-{space_name}-{m}x{n}"), |b| {
                    b.iter(|| {
                        form_q(
                            &team,
                            qr.as_ref(),
                            tau.as_ref(),
                            q.as_mut(),
                            work.as_mut(),
                            FormQParams::default(),
                        )
                        .unwrap();
                    })
                });
            }
        }
    }
}

pub fn matvec(c: &mut Criterion) {
    for (m, n) in [(8, 8), (64, 64), (512, 512), (4096, 256)] {
        let a = Mat::from_fn(m, n, |_, _| random::<f64>());
        let x = Col::from_fn(n, |_| random::<f64>());
        let mut y = Col::from_fn(m, |_| random::<f64>());

        for (name, team) in teams() {
            c.bench_function(&format!("gemv-{name}-{m}x{n}"), |b| {
                b.iter(|| {
                    gemv(&team, 1.0, a.as_ref(), x.as_ref(), 0.5, y.as_mut());
                })
            });
        }
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = pivot, q_formation, matvec
);
criterion_main!(benches);
