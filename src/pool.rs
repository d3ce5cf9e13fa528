//! The fixed worker pool and its one-shot work/result handshake,
//! implemented with `parking_lot` mutex+condvar pairs in place of a
//! pthread mutex/cond handshake.

use crate::heap::{ColorGen, Heap, Partition};
use crate::link::Lnk;
use crate::normal::{normal_go, Seen};
use crate::program::Program;
use crate::stats::Cost;
use parking_lot::{Condvar, Mutex};

/// A unit of work handed to an idle worker: normalize the subtree at `host`
/// with the worker range `[sidx, sidx + slen)`.
struct Job {
  host: u32,
  sidx: usize,
  slen: usize,
}

enum Slot<T> {
  Empty,
  Full(T),
  Shutdown,
}

struct Handshake<T> {
  slot: Mutex<Slot<T>>,
  cond: Condvar,
}

impl<T> Handshake<T> {
  fn new() -> Handshake<T> {
    Handshake { slot: Mutex::new(Slot::Empty), cond: Condvar::new() }
  }

  fn send(&self, value: T) {
    let mut guard = self.slot.lock();
    *guard = Slot::Full(value);
    self.cond.notify_one();
  }

  fn shutdown(&self) {
    let mut guard = self.slot.lock();
    *guard = Slot::Shutdown;
    self.cond.notify_one();
  }

  /// Blocks until a value or a shutdown sentinel arrives. Returns `None` on
  /// shutdown.
  fn recv(&self) -> Option<T> {
    let mut guard = self.slot.lock();
    loop {
      match std::mem::replace(&mut *guard, Slot::Empty) {
        Slot::Full(v) => return Some(v),
        Slot::Shutdown => return None,
        Slot::Empty => self.cond.wait(&mut guard),
      }
    }
  }
}

/// One work slot and one result slot per worker index. The driver (worker
/// 0) never uses its own slots; it calls `normal_go` directly on its
/// thread instead of forking to itself.
pub struct Pool {
  work: Vec<Handshake<Job>>,
  done: Vec<Handshake<()>>,
}

impl Pool {
  pub fn new(workers: usize) -> Pool {
    Pool { work: (0..workers).map(|_| Handshake::new()).collect(), done: (0..workers).map(|_| Handshake::new()).collect() }
  }

  /// Hands work to worker `tid`. Only ever called by a thread that is not
  /// `tid` itself.
  pub fn fork(&self, tid: usize, host: u32, sidx: usize, slen: usize) {
    self.work[tid].send(Job { host, sidx, slen });
  }

  /// Blocks until worker `tid` finishes the job most recently forked to it.
  pub fn join(&self, tid: usize) {
    self.done[tid].recv();
  }

  fn shutdown_all(&self) {
    for w in &self.work {
      w.shutdown();
    }
  }

  /// A worker's main loop: wait for work, run it, publish completion,
  /// repeat until shut down. Returns the worker's final rewrite counts and
  /// words-used, for the driver to fold into the run's totals.
  fn worker_loop(&self, tid: usize, heap: &Heap, program: &Program, workers: usize, seen: &Seen) -> (Cost, u32) {
    // `tid` is never 0 here (the driver runs worker 0 on its own thread),
    // so there is no externally-written prefix to reserve.
    let mut part = Partition::new(tid, (heap.len() / workers) as u32, 0);
    let mut colors = ColorGen::new(tid, workers);
    let mut cost = Cost::default();
    while let Some(job) = self.work[tid].recv() {
      normal_go(heap, program, self, &mut part, &mut colors, &mut cost, job.host, job.sidx, job.slen, seen);
      self.done[tid].send(());
    }
    (cost, part.words_used())
  }
}

/// Spawns `workers - 1` background workers plus drives worker 0 on the
/// calling thread, runs one full normalization of `root`, then shuts every
/// worker down. Returns the combined `(cost, words_used)` across all
/// workers, the `ffi_cost`/`ffi_size` pair.
///
/// `reserved_words` is the count of words an external caller already wrote
/// directly after [`crate::heap::ROOT`] before this call (e.g. a call's own
/// argument block) — mirrors the original runtime's `ffi_normal` seeding
/// `workers[0].size` from the builder's write position, so worker 0's bump
/// allocator never reuses an address that is still live.
pub fn run_parallel(heap: &Heap, program: &Program, workers: usize, root: u32, reserved_words: u32) -> (Cost, u32, Lnk) {
  let pool = Pool::new(workers);
  let seen = Seen::new(heap.len());

  std::thread::scope(|scope| {
    let handles: Vec<_> = (1..workers)
      .map(|tid| {
        let pool = &pool;
        let seen = &seen;
        scope.spawn(move || pool.worker_loop(tid, heap, program, workers, &seen))
      })
      .collect();

    let mut part0 = Partition::new(0, (heap.len() / workers) as u32, reserved_words);
    let mut colors0 = ColorGen::new(0, workers);
    let mut cost0 = Cost::default();

    normal_go(heap, program, &pool, &mut part0, &mut colors0, &mut cost0, root, 0, workers, &seen);
    loop {
      seen.reset();
      let before = cost0.total();
      normal_go(heap, program, &pool, &mut part0, &mut colors0, &mut cost0, root, 0, 1, &seen);
      if cost0.total() == before {
        break;
      }
    }

    pool.shutdown_all();

    let mut total_cost = cost0;
    let mut total_words = part0.words_used();
    for h in handles {
      let (c, w) = h.join().expect("worker thread panicked");
      total_cost += c;
      total_words += w;
    }
    (total_cost, total_words, heap.get(root))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn handshake_round_trips() {
    let hs: Handshake<u32> = Handshake::new();
    hs.send(7);
    assert_eq!(hs.recv(), Some(7));
  }

  #[test]
  fn handshake_shutdown_ends_recv() {
    let hs: Handshake<u32> = Handshake::new();
    hs.shutdown();
    assert_eq!(hs.recv(), None);
  }
}
