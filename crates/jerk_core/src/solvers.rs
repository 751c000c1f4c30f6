use crate::traits::{DynamicalSystem, EmbeddedSteppable, Scalar, Steppable};

/// Writes `state + dt * Σ coeffs[j] * stages[j]` into `out`.
fn combine<T: Scalar>(out: &mut [T], state: &[T], dt: T, coeffs: &[f64], stages: &[Vec<T>]) {
    for i in 0..state.len() {
        let mut acc = T::zero();
        for (c, k) in coeffs.iter().zip(stages) {
            if *c != 0.0 {
                acc = acc + T::lit(*c) * k[i];
            }
        }
        out[i] = state[i] + dt * acc;
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k: [Vec<T>; 4],
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    const C: [f64; 4] = [0.0, 0.5, 0.5, 1.0];
    const B: [f64; 4] = [1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0];

    pub fn new(dim: usize) -> Self {
        Self {
            k: std::array::from_fn(|_| vec![T::zero(); dim]),
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let t0 = *t;
        let n = state.len();

        // Each stage samples at the previous stage's slope scaled by c.
        system.apply(t0, state, &mut self.k[0]);
        for s in 1..4 {
            let c = T::lit(Self::C[s]);
            let (done, rest) = self.k.split_at_mut(s);
            let prev = &done[s - 1];
            for i in 0..n {
                self.tmp[i] = state[i] + dt * c * prev[i];
            }
            system.apply(t0 + c * dt, &self.tmp, &mut rest[0]);
        }

        combine(&mut self.tmp, state, dt, &Self::B, &self.k);
        state.copy_from_slice(&self.tmp);
        *t = t0 + dt;
    }
}

/// Tsitouras 5(4) tableau. `A_TAIL[s]` holds columns `1..s` of stage `s`;
/// the first column is recovered from `c` so each row sums to its node.
mod tsit5_tableau {
    pub const C: [f64; 6] = [0.0, 0.161, 0.327, 0.9, 0.9800255409045097, 1.0];

    pub const A_TAIL: [&[f64]; 6] = [
        &[],
        &[],
        &[0.335480655492357],
        &[-6.359448489975075, 4.362295432869581],
        &[-11.74888356406283, 7.495539342889836, -0.09249506636175525],
        &[
            -12.92096931784711,
            8.159367898576159,
            -0.071584973281401,
            -0.02826905039406838,
        ],
    ];

    pub const B: [f64; 6] = [
        0.09646076681806523,
        0.01,
        0.4798896504144996,
        1.379008574103742,
        -3.290069515436081,
        2.324710524099774,
    ];

    /// Difference between the 5th and embedded 4th order weights, including
    /// the FSAL stage evaluated at the new state.
    pub const B_ERR: [f64; 7] = [
        -0.001780011052225777,
        -0.0008164344596567469,
        0.007880878010261995,
        -0.1447110071732629,
        0.5823571654525552,
        -0.45808210592918697,
        0.015151515151515152,
    ];

    /// Full stage coefficient rows.
    pub fn rows() -> [Vec<f64>; 6] {
        std::array::from_fn(|s| {
            if s == 0 {
                return Vec::new();
            }
            let tail = A_TAIL[s];
            let mut row = Vec::with_capacity(s);
            row.push(C[s] - tail.iter().sum::<f64>());
            row.extend_from_slice(tail);
            row
        })
    }
}

/// Tsitouras 5/4 Solver
pub struct Tsit5<T: Scalar> {
    a: [Vec<f64>; 6],
    k: [Vec<T>; 7],
    tmp: Vec<T>,
    next: Vec<T>,
    err: Vec<T>,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            a: tsit5_tableau::rows(),
            k: std::array::from_fn(|_| vec![T::zero(); dim]),
            tmp: vec![T::zero(); dim],
            next: vec![T::zero(); dim],
            err: vec![T::zero(); dim],
        }
    }

    /// Runs the six stages and the 5th order update into `out`.
    fn advance(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t0: T,
        state: &[T],
        dt: T,
        out: &mut [T],
    ) {
        use tsit5_tableau::{B, C};

        system.apply(t0, state, &mut self.k[0]);
        for s in 1..6 {
            let (done, rest) = self.k.split_at_mut(s);
            combine(&mut self.tmp, state, dt, &self.a[s], done);
            system.apply(t0 + T::lit(C[s]) * dt, &self.tmp, &mut rest[0]);
        }
        combine(out, state, dt, &B, &self.k[..6]);
    }
}

impl<T: Scalar> Steppable<T> for Tsit5<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let mut next = std::mem::take(&mut self.next);
        self.advance(system, *t, state, dt, &mut next);
        state.copy_from_slice(&next);
        self.next = next;
        *t = *t + dt;
    }
}

impl<T: Scalar> EmbeddedSteppable<T> for Tsit5<T> {
    fn error_order(&self) -> usize {
        4
    }

    fn attempt(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        proposal: &mut [T],
        error: &mut [T],
    ) {
        self.advance(system, t, state, dt, proposal);
        system.apply(t + dt, proposal, &mut self.k[6]);

        let zeros = std::mem::take(&mut self.err);
        combine(error, &zeros, dt, &tsit5_tableau::B_ERR, &self.k);
        self.err = zeros;
    }
}
