//! Session controller: turns front-end events into engine calls.
//!
//! The session borrows the graph immutably for its whole lifetime, so the
//! graph cannot be edited while a run is in progress.

use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::engine::{AutoAdvance, Step, SurveyEngine};
use crate::error::SurveyResult;
use crate::graph::SurveyGraph;
use crate::history::ReviewItem;
use crate::model::NodeId;
use crate::render::{RenderBackend, RenderOutput};
use crate::response::{Response, Selection};
use crate::state::SessionStatus;
use crate::view::SurveyView;

pub struct SurveySession<'g, R: RenderBackend> {
    graph: &'g SurveyGraph,
    engine: SurveyEngine,
    renderer: R,
}

impl<'g, R: RenderBackend> SurveySession<'g, R> {
    pub fn new(graph: &'g SurveyGraph, config: EngineConfig, renderer: R) -> Self {
        Self {
            graph,
            engine: SurveyEngine::new(config),
            renderer,
        }
    }

    pub fn graph(&self) -> &'g SurveyGraph {
        self.graph
    }

    pub fn engine(&self) -> &SurveyEngine {
        &self.engine
    }

    pub fn status(&self) -> SessionStatus {
        self.engine.status()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.engine.current()
    }

    #[instrument(skip_all)]
    pub fn start(&mut self) -> SurveyResult<RenderOutput> {
        self.engine.start(self.graph)?;
        Ok(self.render())
    }

    #[instrument(skip_all)]
    pub fn restart(&mut self) -> SurveyResult<RenderOutput> {
        info!("Restarting survey");
        self.start()
    }

    #[instrument(skip(self))]
    pub fn select_answer(&mut self, index: usize) -> SurveyResult<RenderOutput> {
        self.submit(Response::single(index))
    }

    #[instrument(skip(self, text))]
    pub fn select_other(&mut self, index: usize, text: &str) -> SurveyResult<RenderOutput> {
        self.submit(Response::other(index, text))
    }

    #[instrument(skip_all)]
    pub fn submit_multiple(&mut self, selections: Vec<Selection>) -> SurveyResult<RenderOutput> {
        self.submit(Response::multiple_with(selections))
    }

    #[instrument(skip_all)]
    pub fn acknowledge(&mut self) -> SurveyResult<RenderOutput> {
        self.submit(Response::Acknowledge)
    }

    #[instrument(skip_all)]
    pub fn skip(&mut self) -> SurveyResult<RenderOutput> {
        self.submit(Response::Skip)
    }

    #[instrument(skip_all)]
    pub fn go_back(&mut self) -> SurveyResult<RenderOutput> {
        self.engine.go_back(self.graph)?;
        Ok(self.render())
    }

    /// Commits any response and renders the resulting view.
    pub fn submit(&mut self, response: Response) -> SurveyResult<RenderOutput> {
        self.engine.advance(self.graph, response)?;
        Ok(self.render())
    }

    pub fn pending_auto_advance(&self) -> Option<AutoAdvance> {
        self.engine.pending_auto_advance(self.graph)
    }

    /// Fires a scheduled auto-advance; returns `None` for a stale ticket.
    #[instrument(skip(self))]
    pub fn fire_auto_advance(&mut self, ticket: u64) -> SurveyResult<Option<RenderOutput>> {
        let step: Option<Step> = self.engine.fire_auto_advance(self.graph, ticket)?;
        Ok(step.map(|_| self.render()))
    }

    pub fn review(&self) -> Vec<ReviewItem> {
        self.engine.review(self.graph)
    }

    pub fn view(&self) -> SurveyView {
        SurveyView::from_engine(self.graph, &self.engine)
    }

    pub fn render(&self) -> RenderOutput {
        self.renderer.render(&self.view())
    }
}
