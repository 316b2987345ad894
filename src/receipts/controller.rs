use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use log::info;

use super::ReceiptError;
use crate::{
    camera::{CaptureSession, CapturedFrame, FacingMode, SessionSnapshot, SessionStatus},
    models::Receipt,
    settings::AppConfig,
    store::RecordStore,
};

/// Turns camera captures into stored receipts.
///
/// Capturing is one-shot: a successful capture stops the camera, and the
/// next receipt needs a fresh `start_camera`.
#[derive(Clone)]
pub struct ReceiptController {
    session: CaptureSession,
    store: Arc<Mutex<RecordStore>>,
    facing: FacingMode,
    locale: String,
}

impl ReceiptController {
    pub fn new(session: CaptureSession, store: RecordStore, config: &AppConfig) -> Self {
        Self {
            session,
            store: Arc::new(Mutex::new(store)),
            facing: config.preferred_facing,
            locale: config.display_locale.clone(),
        }
    }

    fn store(&self) -> MutexGuard<'_, RecordStore> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub async fn start_camera(&self, viewport_width: u32) -> Result<(), ReceiptError> {
        self.start_camera_facing(self.facing, viewport_width).await
    }

    pub async fn start_camera_facing(
        &self,
        facing: FacingMode,
        viewport_width: u32,
    ) -> Result<(), ReceiptError> {
        self.session.start(facing, viewport_width).await?;
        Ok(())
    }

    pub async fn stop_camera(&self) {
        self.session.stop().await;
    }

    pub async fn acknowledge_camera_error(&self) -> bool {
        self.session.acknowledge_error().await
    }

    pub async fn camera_status(&self) -> SessionStatus {
        self.session.status().await
    }

    pub async fn camera_snapshot(&self) -> SessionSnapshot {
        self.session.snapshot().await
    }

    /// Capture the current frame into a new receipt, persist it, then stop the
    /// camera it came from. Nothing is stored when the capture itself fails.
    ///
    /// A camera stopped and started again while the frame was encoding keeps
    /// running.
    pub async fn capture(&self) -> Result<Receipt, ReceiptError> {
        let CapturedFrame {
            stream_id,
            artifact,
        } = self.session.capture_frame().await?;
        let captured_at = Utc::now();

        let receipt = {
            let mut store = self.store();
            let id = store.next_id(captured_at.timestamp_millis());
            let receipt = Receipt::new(id, &artifact, captured_at, &self.locale);
            store.append(receipt.clone());
            receipt
        };

        self.session.stop_if_current(&stream_id).await;

        info!(
            "Saved receipt {} ({}x{}, {} bytes)",
            receipt.id,
            artifact.width,
            artifact.height,
            artifact.bytes.len()
        );
        Ok(receipt)
    }

    /// Remove a receipt. Callers confirm with the user first.
    pub fn delete(&self, id: i64) -> bool {
        let removed = self.store().remove(id);
        if removed {
            info!("Deleted receipt {id}");
        }
        removed
    }

    /// Newest first.
    pub fn list_all(&self) -> Vec<Receipt> {
        self.store().list()
    }

    pub fn get(&self, id: i64) -> Option<Receipt> {
        self.store().get(id)
    }

    pub fn clear(&self) {
        self.store().clear();
    }

    pub fn storage_degraded(&self) -> bool {
        self.store().is_degraded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::{CaptureError, FrameEncoder, SyntheticCamera},
        storage::MemoryStorage,
    };

    fn controller(camera: &SyntheticCamera) -> (Arc<MemoryStorage>, ReceiptController) {
        let storage = Arc::new(MemoryStorage::new());
        let store = RecordStore::open(storage.clone(), "receipts");
        let session = CaptureSession::new(Arc::new(camera.clone()), FrameEncoder::new(80));
        (storage, ReceiptController::new(session, store, &AppConfig::default()))
    }

    #[tokio::test]
    async fn capture_stores_receipt_and_stops_camera() {
        let camera = SyntheticCamera::new(1920, 1080);
        let (_, controller) = controller(&camera);

        controller.start_camera(400).await.unwrap();
        let receipt = controller.capture().await.unwrap();

        assert!(receipt.image.starts_with("data:image/jpeg;base64,"));
        assert!(!receipt.image_bytes().unwrap().is_empty());
        assert_eq!(controller.list_all(), vec![receipt]);
        assert_eq!(controller.camera_status().await, SessionStatus::Idle);
        assert_eq!(camera.live_tracks(), 0);
    }

    #[tokio::test]
    async fn capture_leaves_a_restarted_camera_running() {
        let camera = SyntheticCamera::new(1920, 1080);
        let (_, controller) = controller(&camera);
        controller.start_camera(400).await.unwrap();
        let old_stream = controller.camera_snapshot().await.stream_id;

        let capture = tokio::spawn({
            let controller = controller.clone();
            async move { controller.capture().await }
        });
        // Let the capture read its frame and start encoding.
        tokio::task::yield_now().await;

        controller.stop_camera().await;
        controller.start_camera(400).await.unwrap();
        let new_stream = controller.camera_snapshot().await.stream_id;
        assert_ne!(old_stream, new_stream);

        let receipt = capture.await.unwrap().unwrap();
        assert_eq!(controller.list_all(), vec![receipt]);
        assert_eq!(controller.camera_status().await, SessionStatus::Active);
        assert_eq!(controller.camera_snapshot().await.stream_id, new_stream);
        assert_eq!(camera.live_tracks(), 1);
    }

    #[tokio::test]
    async fn capture_without_camera_stores_nothing() {
        let camera = SyntheticCamera::new(1920, 1080);
        let (storage, controller) = controller(&camera);

        let err = controller.capture().await.unwrap_err();
        assert_eq!(err, ReceiptError::Capture(CaptureError::NotActive));
        assert!(controller.list_all().is_empty());
        assert_eq!(storage.raw("receipts"), None);
    }

    #[tokio::test]
    async fn frame_failure_keeps_camera_running() {
        let camera = SyntheticCamera::new(1920, 1080);
        let (_, controller) = controller(&camera);
        controller.start_camera(400).await.unwrap();

        camera.fail_frames(true);
        assert!(matches!(
            controller.capture().await.unwrap_err(),
            ReceiptError::Capture(CaptureError::Frame(_))
        ));
        assert_eq!(controller.camera_status().await, SessionStatus::Active);
        assert!(controller.list_all().is_empty());

        camera.fail_frames(false);
        assert!(controller.capture().await.is_ok());
    }

    #[tokio::test]
    async fn rapid_captures_get_distinct_increasing_ids() {
        let camera = SyntheticCamera::new(1920, 1080);
        let (_, controller) = controller(&camera);

        let mut ids = Vec::new();
        for _ in 0..3 {
            controller.start_camera(400).await.unwrap();
            ids.push(controller.capture().await.unwrap().id);
        }
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

        let listed: Vec<i64> = controller.list_all().iter().map(|r| r.id).collect();
        assert_eq!(listed, ids.iter().rev().copied().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let camera = SyntheticCamera::new(1920, 1080);
        let (_, controller) = controller(&camera);
        controller.start_camera(400).await.unwrap();
        let receipt = controller.capture().await.unwrap();

        assert!(!controller.delete(receipt.id + 1));
        assert!(controller.get(receipt.id).is_some());
        assert!(controller.delete(receipt.id));
        assert!(controller.get(receipt.id).is_none());
        assert!(!controller.delete(receipt.id));
    }

    #[tokio::test]
    async fn storage_failure_keeps_receipt_in_memory() {
        let camera = SyntheticCamera::new(1920, 1080);
        let (storage, controller) = controller(&camera);
        storage.fail_writes(true);

        controller.start_camera(400).await.unwrap();
        let receipt = controller.capture().await.unwrap();
        assert!(controller.storage_degraded());
        assert_eq!(controller.list_all(), vec![receipt]);
    }
}
