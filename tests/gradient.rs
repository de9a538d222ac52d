use std::collections::HashMap;
use std::sync::Arc;

use globe_mesh::algs::communicator::{Communicator, NoComm, RayonComm};
use globe_mesh::algs::meshgen::LonLatQuads;
use globe_mesh::config::{EDGE_BASED_FINITE_VOLUME, FvmOptions};
use globe_mesh::field::Field;
use globe_mesh::functionspace::{EdgeBasedFiniteVolume, FunctionSpace};
use globe_mesh::mesh::{Cells, Domain, DualMesh, EdgeTopology, Mesh, Nodes};
use globe_mesh::mesh_error::ErrorKind;
use globe_mesh::numerics::{Nabla, NablaRegistry};
use globe_mesh::util::Earth;
use globe_mesh::util::earth::DEG2RAD;
use serial_test::serial;

const R2: f64 = Earth::RADIUS_IN_METERS * Earth::RADIUS_IN_METERS;

fn fvm_space<C: Communicator + 'static>(mesh: Mesh, comm: C, options: &FvmOptions) -> FunctionSpace<C> {
    EdgeBasedFiniteVolume::new(Arc::new(mesh), comm, options)
        .unwrap()
        .into()
}

/// Fill a scalar field from lon/lat in degrees and return its gradient.
fn gradient_of<C: Communicator + 'static>(fs: &FunctionSpace<C>, f: impl Fn(f64, f64) -> f64) -> (Field, Field) {
    let fvm = fs.as_edge_based_finite_volume().unwrap();
    let nabla = NablaRegistry::with_defaults()
        .create(EDGE_BASED_FINITE_VOLUME, fs)
        .unwrap();
    let mut scalar = fvm.create_field::<f64>("f", 1, 1);
    let lonlat = fvm.mesh().nodes().lonlat();
    for (v, p) in scalar.values_mut::<f64>().unwrap().iter_mut().zip(lonlat) {
        *v = f(p[0], p[1]);
    }
    let mut grad = fvm.create_field::<f64>("grad_f", 1, 2);
    nabla.gradient(&mut scalar, &mut grad).unwrap();
    (scalar, grad)
}

fn interior(p: [f64; 2], lon: [f64; 2], lat: [f64; 2]) -> bool {
    p[0] > lon[0] + 1e-9 && p[0] < lon[1] - 1e-9 && p[1] > lat[0] + 1e-9 && p[1] < lat[1] - 1e-9
}

#[test]
fn linear_field_is_exact_inside_a_uniform_patch() {
    let (lon, lat) = ([10.0, 50.0], [-20.0, 20.0]);
    let fs = fvm_space(
        LonLatQuads::regional(8, 8, lon, lat).generate().unwrap(),
        NoComm,
        &FvmOptions::default(),
    );
    let (_, grad) = gradient_of(&fs, |x, y| 3.0 * x - 2.0 * y + 7.0);
    let fvm = fs.as_edge_based_finite_volume().unwrap();
    let g = grad.values::<f64>().unwrap();
    let mut checked = 0;
    for (n, &p) in fvm.mesh().nodes().lonlat().iter().enumerate() {
        if !interior(p, lon, lat) {
            continue;
        }
        let metric = R2 * (p[1] * DEG2RAD).cos();
        let expected = [3.0 / DEG2RAD / metric, -2.0 / DEG2RAD / metric];
        for c in 0..2 {
            assert!(
                (g[2 * n + c] - expected[c]).abs() <= 1e-10 * expected[c].abs(),
                "node {n} component {c}: {} vs {}",
                g[2 * n + c],
                expected[c]
            );
        }
        checked += 1;
    }
    assert_eq!(checked, 49);
}

/// Largest interior error of the gradient of `sin λ cos φ`, relative to the
/// largest exact value.
fn smooth_field_error(n: usize) -> f64 {
    let (lon, lat) = ([0.0, 60.0], [-30.0, 30.0]);
    let fs = fvm_space(
        LonLatQuads::regional(n, n, lon, lat).generate().unwrap(),
        NoComm,
        &FvmOptions::default(),
    );
    let (_, grad) = gradient_of(&fs, |x, y| (x * DEG2RAD).sin() * (y * DEG2RAD).cos());
    let fvm = fs.as_edge_based_finite_volume().unwrap();
    let g = grad.values::<f64>().unwrap();
    let (mut err, mut scale) = (0.0f64, 0.0f64);
    for (node, &p) in fvm.mesh().nodes().lonlat().iter().enumerate() {
        if !interior(p, lon, lat) {
            continue;
        }
        let (x, y) = (p[0] * DEG2RAD, p[1] * DEG2RAD);
        let exact = [x.cos() * y.cos(), -x.sin() * y.sin()];
        let metric = R2 * y.cos();
        for c in 0..2 {
            err = err.max((g[2 * node + c] * metric - exact[c]).abs());
            scale = scale.max(exact[c].abs());
        }
    }
    err / scale
}

#[test]
fn smooth_field_error_shrinks_with_resolution() {
    let coarse = smooth_field_error(8);
    let fine = smooth_field_error(16);
    assert!(coarse < 0.05, "coarse error {coarse}");
    assert!(fine < 0.5 * coarse, "coarse {coarse}, fine {fine}");
}

#[test]
fn zonal_field_is_symmetric_around_the_pole() {
    let fs = fvm_space(
        LonLatQuads::regular_global(8, 6).generate().unwrap(),
        NoComm,
        &FvmOptions::default(),
    );
    let (_, grad) = gradient_of(&fs, |_, y| (y * DEG2RAD).sin());
    let fvm = fs.as_edge_based_finite_volume().unwrap();
    assert_eq!(fvm.topology().nb_pole_edges(), 8);
    let g = grad.values::<f64>().unwrap();
    let lonlat = fvm.mesh().nodes().lonlat();
    let scale = g.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    for (n, p) in lonlat.iter().enumerate() {
        assert!(g[2 * n].abs() <= 1e-12 * scale, "node {n} at {p:?}: {}", g[2 * n]);
    }
    for ring_lat in [lonlat[0][1], lonlat[lonlat.len() - 1][1]] {
        let ring: Vec<f64> = (0..lonlat.len())
            .filter(|&n| lonlat[n][1] == ring_lat)
            .map(|n| g[2 * n + 1])
            .collect();
        assert_eq!(ring.len(), 8);
        for v in &ring {
            assert!((v - ring[0]).abs() <= 1e-12 * scale);
        }
    }
}

/// Six nodes on one latitude ring with a single pole edge between nodes 0 and 3.
fn six_node_ring(normals: Vec<[f64; 2]>) -> Mesh {
    let lonlat: Vec<[f64; 2]> = (0..6).map(|i| [60.0 * i as f64, 80.0]).collect();
    let nodes = Nodes::serial(lonlat).unwrap();
    let ring: Vec<[usize; 2]> = (0..6).map(|i| [i, (i + 1) % 6]).collect();
    let topology = EdgeTopology::from_edges(&nodes, ring, vec![[0, 3]]).unwrap();
    let dual = DualMesh::from_parts(vec![1.0; 6], normals).unwrap();
    Mesh::with_derived(nodes, Cells::default(), Domain::Global, topology, dual).unwrap()
}

#[test]
fn six_node_ring_with_closed_duals_has_zero_gradient_of_a_constant() {
    let (a, p) = ([1.0, 2.0], [0.5, 0.0]);
    let b = [a[0] + p[0], a[1] + p[1]];
    let fs = fvm_space(
        six_node_ring(vec![a, a, a, b, b, b, p]),
        NoComm,
        &FvmOptions::default(),
    );
    assert_eq!(fs.as_edge_based_finite_volume().unwrap().topology().nb_pole_edges(), 1);
    let (_, grad) = gradient_of(&fs, |_, _| 5.0);
    for &v in grad.values::<f64>().unwrap() {
        assert!((v * R2).abs() < 1e-9, "{v}");
    }
}

#[test]
fn both_pole_edge_endpoints_receive_the_same_latitudinal_flux() {
    let mut normals = vec![[0.0, 0.0]; 6];
    normals.push([0.0, 1.0]);
    let f = |x: f64, _: f64| 1.0 + x / 60.0;
    // f(node 0) = 1, f(node 3) = 4
    let expected = DEG2RAD * 2.5 / (DEG2RAD * DEG2RAD * R2 * (80.0 * DEG2RAD).cos());

    let fs = fvm_space(six_node_ring(normals.clone()), NoComm, &FvmOptions::default());
    let (_, grad) = gradient_of(&fs, f);
    let g = grad.values::<f64>().unwrap();
    for node in [0, 3] {
        assert_eq!(g[2 * node], 0.0);
        assert!((g[2 * node + 1] - expected).abs() <= 1e-12 * expected);
    }
    for node in [1, 2, 4, 5] {
        assert_eq!(&g[2 * node..2 * node + 2], &[0.0, 0.0]);
    }

    let uncorrected = FvmOptions {
        pole_edges: false,
        ..FvmOptions::default()
    };
    let fs = fvm_space(six_node_ring(normals), NoComm, &uncorrected);
    let (_, grad) = gradient_of(&fs, f);
    let g = grad.values::<f64>().unwrap();
    assert!((g[1] - expected).abs() <= 1e-12 * expected);
    assert!((g[7] + expected).abs() <= 1e-12 * expected);
}

#[test]
#[serial]
fn distributed_gradient_matches_serial() {
    let quads = LonLatQuads::regular_global(12, 6);
    let field = |x: f64, y: f64| (x * DEG2RAD).sin() * (y * DEG2RAD).cos() + 0.1 * y;

    let serial_fs = fvm_space(quads.generate().unwrap(), NoComm, &FvmOptions::default());
    let (_, serial_grad) = gradient_of(&serial_fs, field);
    let serial_mesh = serial_fs.as_edge_based_finite_volume().unwrap().mesh().clone();
    let reference: HashMap<u64, [f64; 2]> = serial_mesh
        .nodes()
        .global_ids()
        .iter()
        .zip(serial_grad.values::<f64>().unwrap().chunks(2))
        .map(|(g, v)| (g.get(), [v[0], v[1]]))
        .collect();
    let scale = serial_grad
        .values::<f64>()
        .unwrap()
        .iter()
        .fold(0.0f64, |m, v| m.max(v.abs()));

    let handles: Vec<_> = RayonComm::world(3)
        .into_iter()
        .map(|comm| {
            let mesh = quads.generate_partition(comm.rank(), 3).unwrap();
            std::thread::spawn(move || {
                let fs = fvm_space(mesh, comm, &FvmOptions::default());
                let (_, grad) = gradient_of(&fs, field);
                assert!(!grad.is_dirty());
                let mesh = fs.as_edge_based_finite_volume().unwrap().mesh().clone();
                mesh.nodes()
                    .global_ids()
                    .iter()
                    .zip(grad.values::<f64>().unwrap().chunks(2))
                    .map(|(g, v)| (g.get(), [v[0], v[1]]))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = 0;
    for h in handles {
        for (gid, v) in h.join().unwrap() {
            let r = reference[&gid];
            for c in 0..2 {
                assert!((v[c] - r[c]).abs() <= 1e-12 * scale, "node {gid}: {v:?} vs {r:?}");
            }
            seen += 1;
        }
    }
    assert!(seen > 72);
}

#[test]
fn nabla_rejects_other_function_spaces() {
    use globe_mesh::functionspace::PointCloud;
    let fs: FunctionSpace<NoComm> = PointCloud::new(vec![[0.0, 0.0]]).into();
    let err = NablaRegistry::with_defaults()
        .create(EDGE_BASED_FINITE_VOLUME, &fs)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Shape);
}
