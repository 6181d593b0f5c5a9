// File: src/key.rs

//! Time-ordered unique key generation
//!
//! Keys are 20 characters of a base64 variant whose alphabet is in ASCII
//! order, so byte-wise comparison of two keys matches generation order.
//! Layout of the 15 encoded bytes:
//!
//! | bytes  | content                               |
//! |--------|---------------------------------------|
//! | 0..6   | low 48 bits of Unix time, millis (BE) |
//! | 6      | random per-generator byte             |
//! | 7..15  | counter, randomly seeded (BE)         |

use base64::alphabet::Alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::Engine;
use parking_lot::Mutex;
use rand::Rng;

/// Length of every generated key
pub const KEY_LEN: usize = 20;

const KEY_ALPHABET: &str = "-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const SORTABLE: Alphabet = match Alphabet::new(KEY_ALPHABET) {
    Ok(alphabet) => alphabet,
    Err(_) => panic!("key alphabet is not a valid base64 alphabet"),
};

const ENGINE: GeneralPurpose = GeneralPurpose::new(&SORTABLE, NO_PAD);

const MILLIS_MASK: u64 = (1 << 48) - 1;

struct KeyState {
    last_millis: u64,
    counter: u64,
}

/// Generator of strictly increasing keys
///
/// A single generator is shared by every store handle of a process.
pub struct KeyGenerator {
    node: u8,
    state: Mutex<KeyState>,
}

impl KeyGenerator {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            node: rng.gen(),
            state: Mutex::new(KeyState {
                last_millis: 0,
                counter: rng.gen(),
            }),
        }
    }

    /// Generate the next key
    pub fn next_key(&self) -> String {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.next_at(now)
    }

    fn next_at(&self, now_millis: u64) -> String {
        let (millis, counter) = {
            let mut state = self.state.lock();
            if now_millis > state.last_millis {
                state.last_millis = now_millis;
            } else {
                // same millisecond or clock went backwards
                match state.counter.checked_add(1) {
                    Some(next) => state.counter = next,
                    None => {
                        state.last_millis += 1;
                        state.counter = 0;
                    }
                }
            }
            (state.last_millis, state.counter)
        };

        let mut raw = [0u8; 15];
        raw[..6].copy_from_slice(&(millis & MILLIS_MASK).to_be_bytes()[2..]);
        raw[6] = self.node;
        raw[7..].copy_from_slice(&counter.to_be_bytes());
        ENGINE.encode(raw)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// True if `s` has the shape of a generated key
pub fn is_key(s: &str) -> bool {
    s.len() == KEY_LEN && s.bytes().all(|b| KEY_ALPHABET.as_bytes().contains(&b))
}
