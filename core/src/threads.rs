use std::thread::available_parallelism;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThreadMode {
    Seq,
    Rayon(usize),
    Auto,
}

impl ThreadMode {
    /// Collapses `Auto` and single-thread requests to a concrete mode.
    pub fn resolve(&self) -> ThreadMode {
        match self {
            ThreadMode::Seq => ThreadMode::Seq,
            ThreadMode::Rayon(n) => {
                if *n <= 1 {
                    ThreadMode::Seq
                } else {
                    ThreadMode::Rayon(*n)
                }
            }
            ThreadMode::Auto => {
                let threads = available_parallelism()
                    .map(|count| count.get())
                    .unwrap_or(1);
                if threads <= 1 {
                    ThreadMode::Seq
                } else {
                    ThreadMode::Rayon(threads)
                }
            }
        }
    }

    /// `0` means auto, `1` sequential.
    pub fn from_threads(threads: usize) -> ThreadMode {
        match threads {
            0 => ThreadMode::Auto,
            1 => ThreadMode::Seq,
            n => ThreadMode::Rayon(n),
        }
    }

    /// Dedicated pool for a resolved `Rayon` mode, `None` when sequential.
    pub fn build_pool(&self) -> Result<Option<rayon::ThreadPool>, String> {
        match self.resolve() {
            ThreadMode::Rayon(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map(Some)
                .map_err(|err| format!("E_THREADPOOL {}", err)),
            _ => Ok(None),
        }
    }
}
