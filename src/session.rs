use crate::config::Config;

use landblock_map::{
    CommandHistory, DocumentId, DocumentRegistry, DocumentStore, EditError, EditObserver,
    EditTarget, LayerId, OpenError, PersistencePipeline, SaveRequester, TerrainCommand,
    TerrainDocument, TileKey, TileStore,
};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Whatever draws the terrain. Told which tiles need new render data after their merged records change.
pub trait RenderInvalidator: Send + Sync {
    fn invalidate_tile(&self, tile_x: u8, tile_y: u8);
}

struct SessionObserver {
    invalidator: Arc<dyn RenderInvalidator>,
    saves: SaveRequester,
}

impl EditObserver for SessionObserver {
    fn tiles_invalidated(&self, tiles: &[TileKey]) {
        for key in tiles {
            self.invalidator.invalidate_tile(key.x(), key.y());
        }
    }

    fn document_changed(&self, document: &Arc<TerrainDocument>) {
        self.saves.request_save(document.clone());
    }
}

/// Everything an editor needs to edit terrain: the open documents, the undo history and background saving.
///
/// Edits made through the session invalidate render data and queue a save of the edited document. Call [`Self::close`]
/// before exiting to flush pending saves.
pub struct EditorSession {
    tiles: Arc<TileStore>,
    store: Arc<dyn DocumentStore>,
    registry: DocumentRegistry<TerrainDocument>,
    history: CommandHistory,
    observer: Arc<SessionObserver>,
    pipeline: PersistencePipeline,
    // Dropped last so the pipeline can still shut down on it.
    runtime: Runtime,
}

impl EditorSession {
    pub fn new(
        config: &Config,
        tiles: Arc<TileStore>,
        store: Arc<dyn DocumentStore>,
        invalidator: Arc<dyn RenderInvalidator>,
    ) -> std::io::Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_time().thread_name("landblock-worker");
        if let Some(threads) = config.worker_threads {
            builder.worker_threads(threads.max(1));
        }
        let runtime = builder.build()?;

        let pipeline = PersistencePipeline::start(runtime.handle(), store.clone(), config.persistence);
        let observer = Arc::new(SessionObserver {
            invalidator,
            saves: pipeline.requester(),
        });
        log::info!("Editor session started with {} tiles", tiles.len());

        Ok(Self {
            tiles,
            store,
            registry: DocumentRegistry::default(),
            history: CommandHistory::with_config(&config.history),
            observer,
            pipeline,
            runtime,
        })
    }

    /// The live instance of terrain document `id`, loading it from the store or creating it on first use.
    pub fn open_terrain(&self, id: &str) -> Result<Arc<TerrainDocument>, OpenError> {
        let id = DocumentId::from(id);
        self.registry.get_or_open(&id, || {
            TerrainDocument::open(id.clone(), self.tiles.clone(), self.store.as_ref())
        })
    }

    pub fn document(&self, id: &DocumentId) -> Option<Arc<TerrainDocument>> {
        self.registry.get(id)
    }

    pub fn edit_target(&self, document: &Arc<TerrainDocument>) -> EditTarget {
        EditTarget::new(document.clone(), self.observer.clone())
    }

    /// Runs `command` on `document` and records it in the history unless it changed nothing.
    pub fn execute(
        &mut self,
        document: &Arc<TerrainDocument>,
        command: impl Into<TerrainCommand>,
    ) -> Result<bool, EditError> {
        let target = self.edit_target(document);
        self.history.execute(&target, command.into())
    }

    /// Records a command that a tool already applied through [`Self::edit_target`].
    pub fn record(&mut self, document: &Arc<TerrainDocument>, command: impl Into<TerrainCommand>) {
        let target = self.edit_target(document);
        self.history.record(target, command.into());
    }

    pub fn undo(&mut self) -> Result<bool, EditError> {
        self.history.undo()
    }

    pub fn redo(&mut self) -> Result<bool, EditError> {
        self.history.redo()
    }

    pub fn jump_to(&mut self, index: Option<usize>) -> Result<(), EditError> {
        self.history.jump_to(index)
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommandHistory {
        &mut self.history
    }

    pub fn add_layer(&self, document: &Arc<TerrainDocument>, name: &str) -> LayerId {
        let id = document.add_layer(name);
        self.edit_target(document).notify(&[]);
        id
    }

    /// Removes the layer along with every history entry that edits it.
    pub fn remove_layer(
        &mut self,
        document: &Arc<TerrainDocument>,
        layer: LayerId,
    ) -> Result<(), EditError> {
        let tiles = document.remove_layer(layer)?;
        let dropped = self.history.forget_layer(document.id(), layer);
        if dropped > 0 {
            log::debug!("Dropped {} history entries for removed layer {:?}", dropped, layer);
        }
        self.edit_target(document).notify(&tiles);
        Ok(())
    }

    pub fn move_layer(
        &self,
        document: &Arc<TerrainDocument>,
        layer: LayerId,
        position: usize,
    ) -> Result<(), EditError> {
        let tiles = document.move_layer(layer, position)?;
        self.edit_target(document).notify(&tiles);
        Ok(())
    }

    pub fn rename_layer(
        &self,
        document: &Arc<TerrainDocument>,
        layer: LayerId,
        name: &str,
    ) -> Result<(), EditError> {
        document.rename_layer(layer, name)?;
        self.edit_target(document).notify(&[]);
        Ok(())
    }

    pub fn set_layer_visible(
        &self,
        document: &Arc<TerrainDocument>,
        layer: LayerId,
        visible: bool,
    ) -> Result<(), EditError> {
        let tiles = document.set_layer_visible(layer, visible)?;
        self.edit_target(document).notify(&tiles);
        Ok(())
    }

    pub fn set_active_layer(
        &self,
        document: &Arc<TerrainDocument>,
        layer: LayerId,
    ) -> Result<(), EditError> {
        document.set_active_layer(layer)?;
        self.edit_target(document).notify(&[]);
        Ok(())
    }

    /// Unregisters the document, drops its history entries and queues a final save.
    pub fn close_document(&mut self, id: &DocumentId) -> Option<Arc<TerrainDocument>> {
        let document = self.registry.close(id)?;
        let forgotten = self.history.forget(id);
        log::debug!("Closed {}, dropping {} history entries", id, forgotten);
        self.pipeline.request_save(document.clone());
        Some(document)
    }

    /// Flushes pending saves and stops background saving. Later edits are saved synchronously.
    pub fn close(&mut self) {
        for id in self.registry.ids() {
            if let Some(document) = self.registry.get(&id) {
                self.pipeline.request_save(document);
            }
        }
        self.pipeline.shutdown_blocking();
    }

    pub fn tiles(&self) -> &Arc<TileStore> {
        &self.tiles
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        if self.pipeline.is_running() {
            self.close();
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{uniform_store, RecordingInvalidator};

    use landblock_core::glam::{IVec2, Vec2};
    use landblock_map::{
        AttributeRecord, DocumentOrigin, MemoryDocumentStore, PaintCommand, SetRoadBitCommand,
        VertexUnits, WorldUnits, TERRAIN_KIND,
    };

    fn session(store: &Arc<MemoryDocumentStore>) -> (EditorSession, Arc<RecordingInvalidator>) {
        let mut config = Config::default();
        config.persistence.batch_window_ms = 10;
        config.worker_threads = Some(2);
        let invalidator = Arc::new(RecordingInvalidator::default());
        let session = EditorSession::new(
            &config,
            uniform_store(2, 2, AttributeRecord::ZERO),
            store.clone(),
            invalidator.clone(),
        )
        .unwrap();
        (session, invalidator)
    }

    fn corner_paint(texture: u8) -> PaintCommand {
        PaintCommand::new(WorldUnits(Vec2::splat(192.0)), WorldUnits(30.0), texture, None)
    }

    #[test]
    fn documents_have_one_live_instance() {
        let store = Arc::new(MemoryDocumentStore::default());
        let (session, _) = session(&store);
        let a = session.open_terrain("terrain").unwrap();
        let b = session.open_terrain("terrain").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.origin(), DocumentOrigin::New);
    }

    #[test]
    fn edits_are_saved_and_reloaded() {
        let store = Arc::new(MemoryDocumentStore::default());
        let corner = VertexUnits(IVec2::splat(8));
        {
            let (mut session, invalidator) = session(&store);
            let terrain = session.open_terrain("terrain").unwrap();
            assert!(session.execute(&terrain, corner_paint(7)).unwrap());
            assert_eq!(invalidator.take(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
            session.close();
        }

        let stored = store.document(&"terrain".into()).unwrap();
        assert_eq!(stored.kind, TERRAIN_KIND);

        let (session, _) = session(&store);
        let terrain = session.open_terrain("terrain").unwrap();
        assert_eq!(terrain.origin(), DocumentOrigin::Loaded);
        assert_eq!(terrain.read_vertex(corner).unwrap().texture_type, 7);
    }

    #[test]
    fn undo_and_redo_through_the_session() {
        let store = Arc::new(MemoryDocumentStore::default());
        let (mut session, _) = session(&store);
        let terrain = session.open_terrain("terrain").unwrap();
        let vertex = VertexUnits(IVec2::new(3, 4));

        session
            .execute(&terrain, SetRoadBitCommand::new(vertex, 1))
            .unwrap();
        session
            .execute(&terrain, SetRoadBitCommand::new(vertex, 2))
            .unwrap();
        assert!(session.undo().unwrap());
        assert_eq!(terrain.read_vertex(vertex).unwrap().road, 1);
        session.jump_to(None).unwrap();
        assert_eq!(terrain.read_vertex(vertex).unwrap().road, 0);
        assert!(session.redo().unwrap());
        assert_eq!(terrain.read_vertex(vertex).unwrap().road, 1);
        assert_eq!(
            session.jump_to(Some(2)),
            Err(EditError::HistoryIndexOutOfBounds { index: 2, len: 2 })
        );
    }

    #[test]
    fn hiding_a_layer_invalidates_its_tiles() {
        let store = Arc::new(MemoryDocumentStore::default());
        let (mut session, invalidator) = session(&store);
        let terrain = session.open_terrain("terrain").unwrap();
        let layer = session.add_layer(&terrain, "Roads");
        session.set_active_layer(&terrain, layer).unwrap();
        session
            .execute(&terrain, SetRoadBitCommand::new(VertexUnits(IVec2::new(3, 4)), 3))
            .unwrap();
        invalidator.take();

        session.set_layer_visible(&terrain, layer, false).unwrap();
        assert_eq!(invalidator.take(), vec![(0, 0)]);
        assert_eq!(terrain.read_vertex(VertexUnits(IVec2::new(3, 4))).unwrap().road, 0);
    }

    #[test]
    fn closing_a_document_forgets_its_history() {
        let store = Arc::new(MemoryDocumentStore::default());
        let (mut session, _) = session(&store);
        let terrain = session.open_terrain("terrain").unwrap();
        session.execute(&terrain, corner_paint(2)).unwrap();

        assert!(session.close_document(terrain.id()).is_some());
        assert!(session.history().is_empty());
        assert!(session.document(terrain.id()).is_none());
        assert!(session.close_document(terrain.id()).is_none());
    }

    #[test]
    fn removing_a_layer_drops_its_history() {
        let store = Arc::new(MemoryDocumentStore::default());
        let (mut session, _) = session(&store);
        let terrain = session.open_terrain("terrain").unwrap();
        let vertex = VertexUnits(IVec2::new(3, 4));
        session.execute(&terrain, SetRoadBitCommand::new(vertex, 1)).unwrap();
        let top = session.add_layer(&terrain, "Top");
        session.set_active_layer(&terrain, top).unwrap();
        session.execute(&terrain, SetRoadBitCommand::new(vertex, 2)).unwrap();

        session.remove_layer(&terrain, top).unwrap();
        assert_eq!(session.history().len(), 1);
        assert_eq!(terrain.read_vertex(vertex).unwrap().road, 1);
        assert!(session.undo().unwrap());
        assert_eq!(terrain.read_vertex(vertex).unwrap().road, 0);
        assert!(!session.undo().unwrap());
    }
}
