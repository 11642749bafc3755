//! # rtsim-engine::randvar
//!
//! The `RandomVar` distribution catalog: `Delta`, `Uniform`, `Exponential`,
//! `Pareto`, `Normal` (polar Box-Muller), `Poisson` (direct inversion,
//! cutoff 10000) and `Det` (cyclic replay). Every variant draws from a
//! shared `Rc<RefCell<RandomGen>>` — the "default generator" contract of
//! §4.4 is that variables built without an explicit generator all clone the
//! same `Rc` at construction time, captured by [`crate::sim::Simulation`]'s
//! generator slot rather than a process-wide global.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use rtsim_types::prelude::*;

use crate::rng::RandomGen;

/// A factory-constructible scalar distribution.
pub trait RandomVar {
    fn get(&mut self) -> f64;
}

pub struct Delta {
    value: f64,
}

impl Delta {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl RandomVar for Delta {
    fn get(&mut self) -> f64 {
        self.value
    }
}

pub struct Uniform {
    a: f64,
    b: f64,
    gen: Rc<RefCell<RandomGen>>,
}

impl Uniform {
    pub fn new(a: f64, b: f64, gen: Rc<RefCell<RandomGen>>) -> Self {
        Self { a, b, gen }
    }
}

impl RandomVar for Uniform {
    fn get(&mut self) -> f64 {
        self.a + (self.b - self.a) * self.gen.borrow_mut().uniform01()
    }
}

pub struct Exponential {
    mean: f64,
    gen: Rc<RefCell<RandomGen>>,
}

impl Exponential {
    pub fn new(mean: f64, gen: Rc<RefCell<RandomGen>>) -> Self {
        Self { mean, gen }
    }
}

impl RandomVar for Exponential {
    fn get(&mut self) -> f64 {
        // u in (0, 1], never exactly 0, so ln(u) never diverges.
        let u = 1.0 - self.gen.borrow_mut().uniform01();
        -self.mean * u.ln()
    }
}

pub struct Pareto {
    mu: f64,
    k: f64,
    gen: Rc<RefCell<RandomGen>>,
}

impl Pareto {
    pub fn new(mu: f64, k: f64, gen: Rc<RefCell<RandomGen>>) -> Self {
        Self { mu, k, gen }
    }
}

impl RandomVar for Pareto {
    fn get(&mut self) -> f64 {
        let u = self.gen.borrow_mut().uniform01();
        self.mu * (1.0 - u).powf(-1.0 / self.k)
    }
}

pub struct Normal {
    mu: f64,
    sigma: f64,
    gen: Rc<RefCell<RandomGen>>,
    spare: Option<f64>,
}

impl Normal {
    pub fn new(mu: f64, sigma: f64, gen: Rc<RefCell<RandomGen>>) -> Self {
        Self {
            mu,
            sigma,
            gen,
            spare: None,
        }
    }
}

impl RandomVar for Normal {
    fn get(&mut self) -> f64 {
        if let Some(spare) = self.spare.take() {
            return self.mu + self.sigma * spare;
        }
        loop {
            let u = 2.0 * self.gen.borrow_mut().uniform01() - 1.0;
            let v = 2.0 * self.gen.borrow_mut().uniform01() - 1.0;
            let s = u * u + v * v;
            if s >= 1.0 || s == 0.0 {
                continue;
            }
            let mul = (-2.0 * s.ln() / s).sqrt();
            self.spare = Some(v * mul);
            return self.mu + self.sigma * (u * mul);
        }
    }
}

/// Direct-inversion Poisson sampling (Knuth's algorithm), with a hard
/// cutoff: after 10000 multiplications the loop gives up and returns that
/// count rather than spinning forever for pathologically large `lambda`.
pub struct Poisson {
    l: f64,
    gen: Rc<RefCell<RandomGen>>,
}

const POISSON_CUTOFF: u32 = 10_000;

impl Poisson {
    pub fn new(lambda: f64, gen: Rc<RefCell<RandomGen>>) -> Self {
        Self {
            l: (-lambda).exp(),
            gen,
        }
    }
}

impl RandomVar for Poisson {
    fn get(&mut self) -> f64 {
        let mut k: u32 = 0;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= self.gen.borrow_mut().uniform01();
            if p <= self.l || k >= POISSON_CUTOFF {
                break;
            }
        }
        (k - 1) as f64
    }
}

/// Cyclic replay from a fixed sequence of values, read from memory or a
/// whitespace-separated text file.
pub struct Det {
    values: Vec<f64>,
    next: usize,
}

impl Det {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, next: 0 }
    }

    /// `DetVar(filename)`: the only non-in-memory construction path in the
    /// catalog. Malformed content or a missing file both surface as
    /// `SimError::IoExc`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = fs::read_to_string(path)?;
        let mut values = Vec::new();
        for token in text.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| {
                SimError::IoExc(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("malformed value in DetVar file: '{token}'"),
                ))
            })?;
            values.push(value);
        }
        Ok(Self::new(values))
    }
}

impl RandomVar for Det {
    fn get(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.next];
        self.next = (self.next + 1) % self.values.len();
        v
    }
}

/// Factory entry point per §6's scripted-construction contract: every
/// `RandomVar` variant is reachable by name with a permissively-parsed
/// `Vec<String>` parameter list.
pub fn create_instance(
    class_name: &str,
    params: &[String],
    gen: Rc<RefCell<RandomGen>>,
) -> Result<Box<dyn RandomVar>, SimError> {
    match class_name {
        "Delta" => {
            require_arity(params, 1, "Delta")?;
            Ok(Box::new(Delta::new(parse_f64(&params[0])?)))
        }
        "Uniform" => {
            require_arity(params, 2, "Uniform")?;
            Ok(Box::new(Uniform::new(
                parse_f64(&params[0])?,
                parse_f64(&params[1])?,
                gen,
            )))
        }
        "Exponential" => {
            require_arity(params, 1, "Exponential")?;
            Ok(Box::new(Exponential::new(parse_f64(&params[0])?, gen)))
        }
        "Pareto" => {
            require_arity(params, 2, "Pareto")?;
            Ok(Box::new(Pareto::new(
                parse_f64(&params[0])?,
                parse_f64(&params[1])?,
                gen,
            )))
        }
        "Normal" => {
            require_arity(params, 2, "Normal")?;
            Ok(Box::new(Normal::new(
                parse_f64(&params[0])?,
                parse_f64(&params[1])?,
                gen,
            )))
        }
        "Poisson" => {
            require_arity(params, 1, "Poisson")?;
            Ok(Box::new(Poisson::new(parse_f64(&params[0])?, gen)))
        }
        "Det" => {
            if params.is_empty() {
                return Err(SimError::ParseExc {
                    class_name: "Det".to_string(),
                });
            }
            Ok(Box::new(Det::from_file(&params[0])?))
        }
        other => Err(SimError::ParseExc {
            class_name: other.to_string(),
        }),
    }
}

/// The named distribution catalog, for `rtsim list-distributions`.
pub const CATALOG: &[&str] = &[
    "Delta",
    "Uniform",
    "Exponential",
    "Pareto",
    "Normal",
    "Poisson",
    "Det",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn gen() -> Rc<RefCell<RandomGen>> {
        Rc::new(RefCell::new(RandomGen::new(1)))
    }

    #[test]
    fn delta_is_constant() {
        let mut d = Delta::new(7.0);
        assert_eq!(d.get(), 7.0);
        assert_eq!(d.get(), 7.0);
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let mut u = Uniform::new(2.0, 5.0, gen());
        for _ in 0..1000 {
            let v = u.get();
            assert!((2.0..5.0).contains(&v));
        }
    }

    #[test]
    fn exponential_is_nonnegative() {
        let mut e = Exponential::new(3.0, gen());
        for _ in 0..1000 {
            assert!(e.get() >= 0.0);
        }
    }

    #[test]
    fn same_seed_gives_same_normal_sequence() {
        let mut n1 = Normal::new(0.0, 1.0, gen());
        let mut n2 = Normal::new(0.0, 1.0, gen());
        for _ in 0..10 {
            assert_eq!(n1.get(), n2.get());
        }
    }

    #[test]
    fn poisson_cutoff_never_spins_forever() {
        let mut p = Poisson::new(1e9, gen());
        let v = p.get();
        assert!(v <= POISSON_CUTOFF as f64);
    }

    #[test]
    fn det_replays_cyclically() {
        let mut d = Det::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(d.get(), 1.0);
        assert_eq!(d.get(), 2.0);
        assert_eq!(d.get(), 3.0);
        assert_eq!(d.get(), 1.0);
    }

    #[test]
    fn factory_rejects_wrong_arity() {
        let err = create_instance("Uniform", &["1".into()], gen()).unwrap_err();
        assert!(matches!(err, SimError::ParseExc { .. }));
    }

    #[test]
    fn factory_builds_named_variants() {
        let mut v = create_instance("Delta", &["4.5".into()], gen()).unwrap();
        assert_eq!(v.get(), 4.5);
    }
}
