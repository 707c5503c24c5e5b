//! In-memory inverter for exercising the session and the control loop

use super::{Connector, ModelId, RegisterTransport};
use crate::error::{CurtailError, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Default)]
struct FakeState {
    blocks: BTreeSet<ModelId>,
    points: HashMap<(ModelId, u16), f64>,
    writes: Vec<(ModelId, u16, f64)>,
    reads: Vec<(ModelId, u16)>,
    link_broken: bool,
    failing_connects: u32,
    connect_times: Vec<Instant>,
    closes: usize,
}

#[derive(Clone, Default)]
pub(crate) struct FakeInverter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeInverter {
    /// Blocks 1, 101, 120 and 123 with the given output and rating
    pub(crate) fn legacy(pv_w: f64, rated_w: f64) -> Self {
        let inverter = Self::default();
        {
            let mut s = inverter.state.lock().unwrap();
            s.blocks = [1, 101, 120, 123].into_iter().collect();
            s.points.insert((101, 14), pv_w);
            s.points.insert((120, 3), rated_w);
            s.points.insert((123, 5), 100.0);
        }
        inverter
    }

    pub(crate) fn set_point(&self, block: ModelId, offset: u16, value: f64) {
        self.state
            .lock()
            .unwrap()
            .points
            .insert((block, offset), value);
    }

    pub(crate) fn remove_point(&self, block: ModelId, offset: u16) {
        self.state.lock().unwrap().points.remove(&(block, offset));
    }

    pub(crate) fn clear_blocks(&self) {
        self.state.lock().unwrap().blocks.clear();
    }

    /// Every read and write fails as a dropped link until the next connect
    pub(crate) fn break_link(&self) {
        self.state.lock().unwrap().link_broken = true;
    }

    pub(crate) fn fail_next_connects(&self, n: u32) {
        self.state.lock().unwrap().failing_connects = n;
    }

    pub(crate) fn connect_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().connect_times.clone()
    }

    pub(crate) fn writes(&self) -> Vec<(ModelId, u16, f64)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub(crate) fn reads(&self) -> Vec<(ModelId, u16)> {
        self.state.lock().unwrap().reads.clone()
    }

    /// Links released through `close`
    pub(crate) fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[async_trait::async_trait]
impl RegisterTransport for FakeInverter {
    async fn discover_blocks(&mut self) -> Result<BTreeSet<ModelId>> {
        let s = self.state.lock().unwrap();
        if s.link_broken {
            return Err(CurtailError::modbus("connection reset by peer"));
        }
        Ok(s.blocks.clone())
    }

    async fn read_point(&mut self, block: ModelId, offset: u16) -> Result<f64> {
        let mut s = self.state.lock().unwrap();
        if s.link_broken {
            return Err(CurtailError::modbus("connection reset by peer"));
        }
        s.reads.push((block, offset));
        s.points
            .get(&(block, offset))
            .copied()
            .ok_or_else(|| CurtailError::point_unavailable(block, offset))
    }

    async fn write_point(&mut self, block: ModelId, offset: u16, value: f64) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        if s.link_broken {
            return Err(CurtailError::timeout("Write operation timeout"));
        }
        s.writes.push((block, offset, value));
        s.points.insert((block, offset), value);
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closes += 1;
    }
}

pub(crate) struct FakeConnector {
    inverter: FakeInverter,
}

impl FakeConnector {
    pub(crate) fn new(inverter: FakeInverter) -> Self {
        Self { inverter }
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn RegisterTransport>> {
        let mut s = self.inverter.state.lock().unwrap();
        s.connect_times.push(Instant::now());
        if s.failing_connects > 0 {
            s.failing_connects -= 1;
            return Err(CurtailError::modbus("connection refused"));
        }
        s.link_broken = false;
        drop(s);
        Ok(Box::new(self.inverter.clone()))
    }

    fn describe(&self) -> String {
        "fake inverter".to_string()
    }
}
