//! # JobScheduler
//! Periodic background jobs whose output is cached on disk for the server.

use chrono::{DateTime, TimeZone, Utc};
use log::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const APP_DIR: &str = "sensorboard";

pub fn get_cache_dir() -> PathBuf {
    let base = std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(|_| std::env::temp_dir());
    base.join(APP_DIR)
}

pub fn get_cache_fp(name: &str) -> PathBuf {
    let cache_dir = get_cache_dir();
    if let Err(err) = fs::create_dir_all(&cache_dir) {
        warn!("Could not create cache dir {}: {err}", cache_dir.display());
    }
    cache_dir.join(format!("{name}.json"))
}

pub fn get_last_modified_or_default(filepath: &Path) -> DateTime<Utc> {
    if let Ok(metadata) = fs::metadata(filepath) {
        if let Ok(last_modified) = metadata.modified() {
            return last_modified.into();
        }
    }
    // Oldest possible time so a job without a cache runs right away.
    Utc.timestamp_opt(1, 0).single().unwrap_or_else(Utc::now)
}

type JobFn = Box<dyn (FnMut() -> Option<String>) + Send + 'static>;

pub struct Job {
    name: String,
    interval: usize,
    run: JobFn,
    cache_fp: PathBuf,
    last_run: DateTime<Utc>,
    retries: u64,
}

impl Job {
    pub fn new<T>(name: &str, interval: usize, run: T) -> Job
    where
        T: FnMut() -> Option<String> + Send + 'static,
    {
        Self::with_cache(name, interval, get_cache_fp(name), run)
    }

    pub fn with_cache<T>(name: &str, interval: usize, cache_fp: PathBuf, run: T) -> Job
    where
        T: FnMut() -> Option<String> + Send + 'static,
    {
        let last_run = get_last_modified_or_default(&cache_fp);
        Job {
            name: name.to_string(),
            interval,
            run: Box::new(run),
            cache_fp,
            last_run,
            retries: 3,
        }
    }

    fn tick(&mut self) {
        let now = Utc::now();

        let next_time = self.last_run.timestamp() + self.interval as i64;
        if next_time > now.timestamp() {
            return;
        }
        info!("Running {name}", name = self.name);

        let mut iterations = 0;
        loop {
            match (self.run)() {
                Some(output) => {
                    if let Err(err) = fs::write(&self.cache_fp, output.as_bytes()) {
                        error!("Could not write cache {}: {err}", self.cache_fp.display());
                    }
                    break;
                }
                None => {
                    iterations += 1;
                    if iterations == self.retries {
                        error!("Failed running '{name}' after {iterations} attempts", name = self.name);
                        break;
                    }
                    thread::sleep(Duration::from_secs(iterations));
                }
            }
        }

        info!("Finished {name}", name = self.name);
        self.last_run = now;
    }

    pub fn time_till_next_run(&self) -> Duration {
        let next_time = self.last_run.timestamp() + self.interval as i64;
        let next_in_secs = next_time - Utc::now().timestamp();
        Duration::from_secs(next_in_secs.max(0) as u64)
    }

    pub fn run(self) {
        let job_name = format!("{name}-job", name = self.name);
        let job = Arc::new(Mutex::new(self));

        let spawned = thread::Builder::new().name(job_name.clone()).spawn(move || {
            debug!("[{job_name}]: started thread");
            loop {
                let sleep_for = match job.lock() {
                    Ok(mut job) => {
                        job.tick();
                        job.time_till_next_run()
                    }
                    Err(_) => {
                        error!("[{job_name}]: job state poisoned, stopping");
                        return;
                    }
                };
                debug!("[{job_name}]: sleeping for {sleep_for:?}");
                thread::sleep(sleep_for);
            }
        });
        if let Err(err) = spawned {
            error!("Error spawning job-scheduler thread: {err}");
        }
    }
}
