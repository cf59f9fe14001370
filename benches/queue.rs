#![feature(test)]
extern crate test;

use lf_ring::{BoundedQueue, SpscQueue, UnboundedQueue};

// cargo +nightly bench
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use test::Bencher;

    const COUNT: usize = 1_000;
    const CONCURRENCY: usize = 4;

    // cargo +nightly bench --package lf-ring --bench queue -- tests::mpmc --exact
    #[bench]
    fn mpmc(b: &mut Bencher) {
        let queue: BoundedQueue<usize> = BoundedQueue::new(256);

        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..CONCURRENCY {
                    s.spawn(|| {
                        for _ in 0..COUNT {
                            while queue.try_pop().is_none() {
                                std::hint::spin_loop();
                            }
                        }
                    });
                    s.spawn(|| {
                        for i in 0..COUNT {
                            queue.push(i);
                        }
                    });
                }
            });
        });
    }

    // cargo +nightly bench --package lf-ring --bench queue -- tests::spsc --exact
    #[bench]
    fn spsc(b: &mut Bencher) {
        let queue: SpscQueue<usize> = SpscQueue::new(256);

        b.iter(|| {
            thread::scope(|s| {
                let mut writer = queue.writer().unwrap();
                s.spawn(move || {
                    for i in 0..COUNT * CONCURRENCY {
                        writer.push(i);
                    }
                });

                let mut reader = queue.reader().unwrap();
                for _ in 0..COUNT * CONCURRENCY {
                    while reader.try_pop().is_none() {
                        std::hint::spin_loop();
                    }
                }
            });
        });
    }

    // cargo +nightly bench --package lf-ring --bench queue -- tests::unbounded --exact
    #[bench]
    fn unbounded(b: &mut Bencher) {
        let queue: UnboundedQueue<usize> = UnboundedQueue::new();

        b.iter(|| {
            thread::scope(|s| {
                let mut writer = queue.writer().unwrap();
                s.spawn(move || {
                    for i in 0..COUNT * CONCURRENCY {
                        writer.push(i);
                    }
                });

                let mut reader = queue.reader().unwrap();
                for _ in 0..COUNT * CONCURRENCY {
                    while reader.try_pop().is_none() {
                        std::hint::spin_loop();
                    }
                }
            });
        });
    }
}
