use std::fmt;

use graphconfig::TransitionMode;
use rand::Rng;

use crate::SchedulerError;

/// Stable ordinal of a parametric function inside a [`FunctionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u32);

impl FunctionId {
    pub const fn new(index: u32) -> Self {
        FunctionId(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered, cyclic set of named functions.
///
/// The registry only hands out ids in `[0, len)`; the device-side kernel
/// library is expected to register the same names in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRegistry {
    names: Vec<String>,
}

impl FunctionRegistry {
    pub fn new<I, S>(names: I) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if collected
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(&name))
            {
                return Err(SchedulerError::DuplicateFunction(name));
            }
            collected.push(name);
        }
        if collected.is_empty() {
            return Err(SchedulerError::EmptyRegistry);
        }
        Ok(Self { names: collected })
    }

    /// Number of registered functions (`FunctionCount`).
    pub fn len(&self) -> u32 {
        self.names.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        id.index() < self.len()
    }

    pub fn name(&self, id: FunctionId) -> &str {
        &self.names[id.index() as usize]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = FunctionId> {
        (0..self.len()).map(FunctionId::new)
    }

    pub fn lookup(&self, name: &str) -> Result<FunctionId, SchedulerError> {
        let wanted = name.trim();
        self.names
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(wanted))
            .map(|index| FunctionId::new(index as u32))
            .ok_or_else(|| SchedulerError::UnknownFunction(wanted.to_string()))
    }

    pub fn next_in_cycle(&self, current: FunctionId) -> FunctionId {
        debug_assert!(self.contains(current), "function {current} not registered");
        FunctionId::new((current.index() + 1) % self.len())
    }

    /// Uniform pick among every function except `current`.
    ///
    /// Returns `None` when the registry holds a single function.
    pub fn random_other_than<R>(&self, current: FunctionId, rng: &mut R) -> Option<FunctionId>
    where
        R: Rng + ?Sized,
    {
        debug_assert!(self.contains(current), "function {current} not registered");
        let count = self.len();
        if count < 2 {
            return None;
        }
        let pick = rng.gen_range(0..count - 1);
        let index = if pick >= current.index() { pick + 1 } else { pick };
        Some(FunctionId::new(index))
    }

    pub fn next<R>(&self, mode: TransitionMode, current: FunctionId, rng: &mut R) -> Option<FunctionId>
    where
        R: Rng + ?Sized,
    {
        match mode {
            TransitionMode::Cycle => Some(self.next_in_cycle(current)),
            TransitionMode::Random => self.random_other_than(current, rng),
        }
    }
}
