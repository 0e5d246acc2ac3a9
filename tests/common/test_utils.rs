use cgmath::{InnerSpace, Matrix4, Vector3};
use voxel_canvas::input::{Endpoint, EventSink, Payload};

/// Keeps every payload instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub sent: Vec<(Endpoint, Payload)>,
}

impl RecordingSink {
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.sent.iter().map(|(e, _)| *e).collect()
    }

    pub fn json(&self) -> Vec<serde_json::Value> {
        self.sent
            .iter()
            .map(|(_, p)| serde_json::to_value(p).unwrap())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn send(&mut self, endpoint: Endpoint, payload: Payload) {
        self.sent.push((endpoint, payload));
    }
}

pub const EPS: f32 = 1e-5;

pub fn assert_unit(v: Vector3<f32>) {
    assert!((v.magnitude() - 1.0).abs() < EPS, "{v:?} is not unit length");
}

pub fn assert_orthogonal(a: Vector3<f32>, b: Vector3<f32>) {
    assert!(a.dot(b).abs() < EPS, "{a:?} and {b:?} are not orthogonal");
}

pub fn assert_matrix_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
    let a: [[f32; 4]; 4] = a.into();
    let b: [[f32; 4]; 4] = b.into();
    for (col_a, col_b) in a.iter().zip(b.iter()) {
        for (x, y) in col_a.iter().zip(col_b.iter()) {
            assert!((x - y).abs() < EPS, "{a:?} != {b:?}");
        }
    }
}

/// Deterministic pseudo-random sequence for property-style tests.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    /// Uniform in `lo..=hi`.
    pub fn range(&mut self, lo: i32, hi: i32) -> i32 {
        lo + (self.next_u32() % (hi - lo + 1) as u32) as i32
    }
}
