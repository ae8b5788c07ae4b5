//! Batch results: clean output plus every rejected record or venue.
//!
//! RULE: a failure is never dropped. A caller must always be able to tell
//! "processed cleanly" apart from "something was rejected".

use crate::{
    error::{PipelineError, PipelineResult},
    types::VenueId,
};

/// One rejected unit of work, keyed by the venue it belongs to.
#[derive(Debug)]
pub struct Rejection {
    pub venue_id: VenueId,
    pub error:    PipelineError,
}

#[derive(Debug)]
pub struct Batch<T> {
    pub ok:       Vec<T>,
    pub failures: Vec<Rejection>,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self { ok: Vec::new(), failures: Vec::new() }
    }
}

impl<T> Batch<T> {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn reject(&mut self, venue_id: VenueId, error: PipelineError) {
        self.failures.push(Rejection { venue_id, error });
    }

    /// All output if nothing was rejected, otherwise the first rejection.
    pub fn into_result(self) -> PipelineResult<Vec<T>> {
        match self.failures.into_iter().next() {
            Some(rejection) => Err(rejection.error),
            None => Ok(self.ok),
        }
    }
}
