//! Time-ordered, collision-free record keys.
//!
//! A key is 20 characters: eight encode the creation time in milliseconds and
//! twelve are random. Keys generated within the same millisecond increment the
//! random half instead of redrawing it, so keys from one generator always sort
//! in creation order.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand_core::{OsRng, RngCore};

use crate::path::PushId;

/// Alphabet in ASCII order, so lexicographic order equals numeric order.
const PUSH_CHARS: &[u8; 64] =
  b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_LEN: usize = 8;
const RANDOM_LEN: usize = 12;

#[derive(Debug)]
struct State {
  last_millis: i64,
  last_random: [u8; RANDOM_LEN],
}

/// Generates [`PushId`]s. Share one generator per store so that every key it
/// hands out is unique.
#[derive(Debug)]
pub struct PushIdGenerator {
  state: Mutex<State>,
}

impl Default for PushIdGenerator {
  fn default() -> Self { Self::new() }
}

impl PushIdGenerator {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(State { last_millis: -1, last_random: [0; RANDOM_LEN] }),
    }
  }

  pub fn generate(&self) -> PushId { self.generate_at(Utc::now().timestamp_millis()) }

  /// Generate a key as if the clock read `now_millis`. A clock that steps
  /// backwards is ignored; the previous instant is reused.
  pub fn generate_at(&self, now_millis: i64) -> PushId {
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
    let mut millis = now_millis.max(state.last_millis).max(0);

    if millis == state.last_millis && !increment(&mut state.last_random) {
      // The random half wrapped around; borrow the next millisecond.
      millis += 1;
      state.last_random = fresh_random();
    } else if millis != state.last_millis {
      state.last_random = fresh_random();
    }
    state.last_millis = millis;

    let mut key = [0u8; TIME_LEN + RANDOM_LEN];
    let mut remaining = millis;
    for slot in key[..TIME_LEN].iter_mut().rev() {
      *slot = PUSH_CHARS[(remaining % 64) as usize];
      remaining /= 64;
    }
    for (slot, digit) in key[TIME_LEN..].iter_mut().zip(state.last_random) {
      *slot = PUSH_CHARS[digit as usize];
    }

    PushId::from_generated(key.iter().map(|&b| b as char).collect())
  }
}

/// Decode the creation time embedded in a generated key.
pub fn timestamp_of(id: &PushId) -> Option<i64> {
  let bytes = id.as_str().as_bytes();
  if bytes.len() != TIME_LEN + RANDOM_LEN {
    return None;
  }
  bytes[..TIME_LEN].iter().try_fold(0i64, |acc, b| {
    let digit = PUSH_CHARS.iter().position(|c| c == b)?;
    Some(acc * 64 + digit as i64)
  })
}

fn fresh_random() -> [u8; RANDOM_LEN] {
  let mut bytes = [0u8; RANDOM_LEN];
  OsRng.fill_bytes(&mut bytes);
  bytes.map(|b| b & 63)
}

/// Add one to a base-64 digit string. Returns `false` on overflow.
fn increment(digits: &mut [u8; RANDOM_LEN]) -> bool {
  for digit in digits.iter_mut().rev() {
    if *digit == 63 {
      *digit = 0;
    } else {
      *digit += 1;
      return true;
    }
  }
  false
}
