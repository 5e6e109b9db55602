//! Background worker that runs sheet and photo loads off the UI thread.
//!
//! Jobs are executed one after the other in the order they were queued. There is no
//! cancellation and no de-duplication: every queued job produces exactly one result.

use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use crate::domain::PortalError;
use crate::loader::SheetClient;
use crate::performers::PhotoLoader;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    LoadContacts(String),
    LoadPerformers(String),
    LoadPhoto { performer: usize, url: String },
}

#[derive(Debug)]
pub enum JobResult {
    Contacts(Result<Table, PortalError>),
    Performers(Result<Table, PortalError>),
    PhotoLoaded { performer: usize, url: String },
    PhotoFailed { performer: usize, url: String },
}

pub fn execute(client: &SheetClient, photos: &dyn PhotoLoader, job: Job) -> JobResult {
    match job {
        Job::LoadContacts(sheet) => JobResult::Contacts(client.fetch_table(&sheet)),
        Job::LoadPerformers(sheet) => JobResult::Performers(client.fetch_table(&sheet)),
        Job::LoadPhoto { performer, url } => match photos.load(&url) {
            Ok(()) => JobResult::PhotoLoaded { performer, url },
            Err(e) => {
                trace!("Photo {url} failed: {e}");
                JobResult::PhotoFailed { performer, url }
            }
        },
    }
}

pub fn spawn_worker(
    client: SheetClient,
    photos: Box<dyn PhotoLoader>,
    job_rx: Receiver<Job>,
    result_tx: Sender<JobResult>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(job) = job_rx.recv() {
            trace!("Worker got {job:?}");
            let result = execute(&client, photos.as_ref(), job);
            if result_tx.send(result).is_err() {
                break;
            }
        }
        debug!("Worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::fake::FakeSheetSource;
    use std::sync::mpsc;

    struct NoPhotos;

    impl PhotoLoader for NoPhotos {
        fn load(&self, url: &str) -> Result<(), String> {
            if url.contains("ok") {
                Ok(())
            } else {
                Err("404".into())
            }
        }
    }

    #[test]
    fn worker_answers_every_job_in_order() {
        let source = FakeSheetSource::default().with("Supplier Contacts", 200, r#"[["Supplier"], ["Acme"]]"#);
        let (job_tx, job_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let handle = spawn_worker(
            SheetClient::new(Box::new(source)),
            Box::new(NoPhotos),
            job_rx,
            result_tx,
        );

        job_tx.send(Job::LoadContacts("Supplier Contacts".into())).unwrap();
        job_tx.send(Job::LoadPerformers("Top Performer".into())).unwrap();
        job_tx
            .send(Job::LoadPhoto { performer: 3, url: "https://x/ok.png".into() })
            .unwrap();
        job_tx
            .send(Job::LoadPhoto { performer: 4, url: "https://x/missing.png".into() })
            .unwrap();
        drop(job_tx);

        let results: Vec<JobResult> = result_rx.iter().collect();
        handle.join().unwrap();
        assert_eq!(results.len(), 4);
        assert!(matches!(&results[0], JobResult::Contacts(Ok(t)) if t.rows.len() == 1));
        assert!(matches!(&results[1], JobResult::Performers(Err(PortalError::Remote(_)))));
        assert!(matches!(&results[2], JobResult::PhotoLoaded { performer: 3, .. }));
        assert!(matches!(&results[3], JobResult::PhotoFailed { performer: 4, .. }));
    }
}
