//! Host bindings: the seam through which a game exposes its state as bound
//! variables and receives flight-control ("fly-by-wire") toggles.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    value::Value,
    variable::{BoundGetter, BoundSetter, VariableTable},
};

pub trait Binding {
    /// Register this binding's variables. Called on every boot.
    fn add_to(&mut self, vars: &mut VariableTable);

    /// Called before each tick.
    fn update(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returns whether this binding owns `channel`.
    fn toggle_fly_by_wire(&mut self, _channel: &str, _enabled: bool) -> bool {
        false
    }

    /// Release every channel this binding controls.
    fn unbind(&mut self) {}
}

#[derive(Default)]
pub struct BindingManager {
    bindings: Vec<Box<dyn Binding>>,
}

impl BindingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, binding: Box<dyn Binding>) {
        self.bindings.push(binding);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn load(&mut self, vars: &mut VariableTable) {
        for binding in &mut self.bindings {
            binding.add_to(vars);
        }
    }

    /// Run every update hook and collect the failures. A failing hook does not
    /// stop the others.
    pub fn pre_update(&mut self) -> Vec<anyhow::Error> {
        let mut errors = Vec::new();
        for binding in &mut self.bindings {
            if let Err(e) = binding.update() {
                log::error!("binding update failed: {e:#}");
                errors.push(e);
            }
        }
        errors
    }

    pub fn toggle_fly_by_wire(&mut self, channel: &str, enabled: bool) {
        let channel = channel.to_lowercase();
        let handled = self
            .bindings
            .iter_mut()
            .fold(false, |handled, b| b.toggle_fly_by_wire(&channel, enabled) || handled);
        if !handled {
            log::debug!("no binding handles fly-by-wire channel {channel}");
        }
    }

    pub fn unbind(&mut self) {
        for binding in &mut self.bindings {
            binding.unbind();
        }
    }
}

impl std::fmt::Debug for BindingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingManager").field("bindings", &self.bindings.len()).finish()
    }
}

/// A binding made of plain closures, one per variable.
#[derive(Default)]
pub struct ClosureBinding {
    vars: Vec<(String, Option<BoundGetter>, Option<BoundSetter>)>,
}

impl ClosureBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn getter<F>(mut self, name: &str, get: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + 'static,
    {
        self.vars.push((name.to_string(), Some(Rc::new(get)), None));
        self
    }

    pub fn setter<F>(mut self, name: &str, set: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<()> + 'static,
    {
        self.vars.push((name.to_string(), None, Some(Rc::new(set))));
        self
    }

    pub fn get_set<G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        G: Fn() -> anyhow::Result<Value> + 'static,
        S: Fn(Value) -> anyhow::Result<()> + 'static,
    {
        self.vars.push((name.to_string(), Some(Rc::new(get)), Some(Rc::new(set))));
        self
    }
}

impl Binding for ClosureBinding {
    fn add_to(&mut self, vars: &mut VariableTable) {
        for (name, get, set) in &self.vars {
            vars.bind(name, get.clone(), set.clone());
        }
    }
}

/// Fly-by-wire channel states shared with the host.
pub type ChannelStates = Rc<RefCell<HashMap<String, bool>>>;

/// Tracks which control channels (`steering`, `throttle`, ...) a script holds.
#[derive(Debug)]
pub struct FlightControlBinding {
    channels: Vec<String>,
    states: ChannelStates,
}

impl FlightControlBinding {
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(|c| c.into().to_lowercase()).collect(),
            states: Rc::default(),
        }
    }

    pub fn states(&self) -> ChannelStates {
        Rc::clone(&self.states)
    }

    pub fn is_enabled(&self, channel: &str) -> bool {
        self.states.borrow().get(&channel.to_lowercase()).copied().unwrap_or(false)
    }
}

impl Binding for FlightControlBinding {
    fn add_to(&mut self, _vars: &mut VariableTable) {
        self.states.borrow_mut().clear();
    }

    fn toggle_fly_by_wire(&mut self, channel: &str, enabled: bool) -> bool {
        if !self.channels.iter().any(|c| c == channel) {
            return false;
        }
        log::debug!("fly-by-wire {channel} -> {enabled}");
        self.states.borrow_mut().insert(channel.to_string(), enabled);
        true
    }

    fn unbind(&mut self) {
        for state in self.states.borrow_mut().values_mut() {
            *state = false;
        }
    }
}
