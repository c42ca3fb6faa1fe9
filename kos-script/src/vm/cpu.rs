use std::{
    rc::Rc,
    time::{Duration, Instant},
};

use crate::{
    binding::{Binding, BindingManager},
    calculator::{calculate, Operator},
    config::CpuConfig,
    error::{KosError, Result},
    function::FunctionRegistry,
    output::{ConsoleOutput, OutputSink},
    persist::{restore_program, SavedVariable},
    suffix::{Signature, Structure, Suffix, SuffixRegistry},
    value::Value,
    variable::VariableTable,
    vm::{
        context::ProgramContext,
        opcode::{ExecOutcome, Op, Opcode},
        program::CodePart,
        stack::Stack,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuStatus {
    Running,
    /// The main stream is parked; triggers still run.
    Waiting,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Statistics {
    pub update_time: Duration,
    pub trigger_time: Duration,
    pub execution_time: Duration,
    pub instructions: u64,
}

/// The scheduler: owns the stack, variables, function table and program
/// contexts, and advances them one host tick at a time.
pub struct Cpu {
    config: CpuConfig,
    stack: Stack,
    vars: VariableTable,
    functions: Rc<FunctionRegistry>,
    suffixes: Rc<SuffixRegistry>,
    bindings: BindingManager,
    contexts: Vec<ProgramContext>,
    status: CpuStatus,
    session_time: f64,
    /// `None` while waiting means until `endwait`.
    wait_until: Option<f64>,
    output: Box<dyn OutputSink>,
    stats: Statistics,
}

/// Registration pass for a [`Cpu`]. Everything added here is fixed once
/// [`CpuBuilder::build`] returns.
pub struct CpuBuilder {
    config: CpuConfig,
    functions: FunctionRegistry,
    suffixes: SuffixRegistry,
    bindings: BindingManager,
    output: Box<dyn OutputSink>,
}

impl Default for CpuBuilder {
    fn default() -> Self {
        Self {
            config: CpuConfig::default(),
            functions: FunctionRegistry::with_builtins(),
            suffixes: SuffixRegistry::with_defaults(),
            bindings: BindingManager::new(),
            output: Box::new(ConsoleOutput),
        }
    }
}

impl CpuBuilder {
    pub fn config(mut self, config: CpuConfig) -> Self {
        self.config = config;
        self
    }

    pub fn output<S: OutputSink + 'static>(mut self, sink: S) -> Self {
        self.output = Box::new(sink);
        self
    }

    /// Replace the whole function table, built-ins included.
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn function<F>(mut self, name: &str, signature: Signature, body: F) -> Self
    where
        F: Fn(&mut Cpu, Vec<Value>) -> Result<Value> + 'static,
    {
        self.functions.register(name, signature, body);
        self
    }

    pub fn suffix<F>(mut self, type_name: &str, name: &str, f: F) -> Self
    where
        F: Fn(Rc<dyn Structure>) -> Suffix + 'static,
    {
        self.suffixes.register(type_name, name, f);
        self
    }

    pub fn binding<B: Binding + 'static>(mut self, binding: B) -> Self {
        self.bindings.add(Box::new(binding));
        self
    }

    pub fn build(self) -> Cpu {
        let mut cpu = Cpu {
            stack: Stack::new(self.config.max_stack_depth, self.config.enable_safe_mode),
            config: self.config,
            vars: VariableTable::new(),
            functions: Rc::new(self.functions),
            suffixes: Rc::new(self.suffixes),
            bindings: self.bindings,
            contexts: Vec::new(),
            status: CpuStatus::Running,
            session_time: 0.0,
            wait_until: None,
            output: self.output,
            stats: Statistics::default(),
        };
        cpu.boot();
        cpu
    }
}

impl Cpu {
    pub fn builder() -> CpuBuilder {
        CpuBuilder::default()
    }

    /// Reset to a bare interpreter with freshly bound host variables.
    pub fn boot(&mut self) {
        self.contexts.clear();
        self.stack = Stack::new(self.config.max_stack_depth, self.config.enable_safe_mode);
        self.vars.clear();
        self.bindings.load(&mut self.vars);
        self.status = CpuStatus::Running;
        self.session_time = 0.0;
        self.wait_until = None;
        self.stats = Statistics::default();
        self.contexts.push(ProgramContext::new(true));
        log::debug!("booted with {} bound variables", self.vars.len());
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn variables(&self) -> &VariableTable {
        &self.vars
    }

    pub fn variables_mut(&mut self) -> &mut VariableTable {
        &mut self.vars
    }

    pub fn status(&self) -> CpuStatus {
        self.status
    }

    pub fn session_time(&self) -> f64 {
        self.session_time
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn current_context(&self) -> Result<&ProgramContext> {
        self.contexts.last().ok_or(KosError::NoContext)
    }

    pub fn current_context_mut(&mut self) -> Result<&mut ProgramContext> {
        self.contexts.last_mut().ok_or(KosError::NoContext)
    }

    pub fn interpreter_context(&mut self) -> Result<&mut ProgramContext> {
        self.contexts.first_mut().ok_or(KosError::NoContext)
    }

    /// The topmost program context, created empty if only the interpreter exists.
    pub fn program_context(&mut self) -> Result<&mut ProgramContext> {
        if self.contexts.len() == 1 {
            self.push_context(ProgramContext::new(false));
        }
        self.current_context_mut()
    }

    /// Append code to the interpreter. It runs on the next tick.
    pub fn run_command(&mut self, parts: Vec<CodePart>) -> Result<()> {
        self.interpreter_context()?.add_parts(parts)
    }

    /// Start `parts` as a new program above the current context.
    pub fn run_program(&mut self, parts: Vec<CodePart>, silent: bool) -> Result<()> {
        let mut context = ProgramContext::new(false);
        context.silent = silent;
        context.add_parts(parts)?;
        self.push_context(context);
        Ok(())
    }

    /// Replay saved variables as a silent program.
    pub fn restore_variables(&mut self, saved: &[SavedVariable]) -> Result<()> {
        if saved.is_empty() {
            return Ok(());
        }
        self.run_program(vec![restore_program(saved)], true)
    }

    pub fn print(&mut self, line: &str) {
        self.output.print(line);
    }

    pub fn toggle_fly_by_wire(&mut self, channel: &str, enabled: bool) -> Result<()> {
        self.current_context_mut()?.toggle_fly_by_wire(channel, enabled);
        self.bindings.toggle_fly_by_wire(channel, enabled);
        Ok(())
    }

    fn push_context(&mut self, mut context: ProgramContext) {
        if let Some(current) = self.contexts.last() {
            current.disable_active_fly_by_wire(&mut self.bindings);
        }
        let pointers = self.vars.pointers();
        for (name, _) in &pointers {
            self.vars.remove(name);
        }
        log::debug!(
            "pushing context {} (saved {} pointers)",
            self.contexts.len(),
            pointers.len()
        );
        context.saved_pointers = pointers;
        self.contexts.push(context);
    }

    fn pop_context(&mut self) {
        if self.contexts.len() <= 1 {
            return;
        }
        let Some(context) = self.contexts.pop() else { return };
        context.disable_active_fly_by_wire(&mut self.bindings);

        let defined: Vec<String> = self.vars.pointers().into_iter().map(|(name, _)| name).collect();
        for name in &defined {
            self.vars.remove(name);
        }
        for (name, value) in &context.saved_pointers {
            // Plain assignment of a pointer can't fail.
            let _ = self.vars.set(name, value.clone());
        }
        log::debug!(
            "popped context {} (dropped {} pointers, restored {})",
            self.contexts.len(),
            defined.len(),
            context.saved_pointers.len()
        );

        if let Some(current) = self.contexts.last() {
            current.enable_active_fly_by_wire(&mut self.bindings);
        }
    }

    fn pop_first_context(&mut self) {
        while self.contexts.len() > 1 {
            self.pop_context();
        }
    }

    /// Stop the running program.
    ///
    /// `manual` is a user abort: every program context goes and all channels are
    /// released. Otherwise only the finished context is popped. With only the
    /// interpreter left, triggers are cleared and the current statement skipped.
    pub fn break_execution(&mut self, manual: bool) {
        log::debug!("break execution (manual={manual}, contexts={})", self.contexts.len());
        if self.contexts.len() > 1 {
            self.end_wait();
            if manual {
                self.pop_first_context();
                if let Some(interpreter) = self.contexts.first_mut() {
                    interpreter.clear_triggers();
                    interpreter.clear_fly_by_wire();
                }
                self.print("Program aborted.");
                self.bindings.unbind();
            } else {
                let silent = self.contexts.last().is_some_and(|c| c.silent);
                self.pop_context();
                if self.contexts.len() == 1 && !silent {
                    self.print("Program ended.");
                }
            }
            self.print_statistics();
        } else if let Some(interpreter) = self.contexts.last_mut() {
            interpreter.clear_triggers();
            interpreter.skip_current_statement();
        }
    }

    pub fn start_wait(&mut self, seconds: f64) {
        self.wait_until = (seconds > 0.0).then(|| self.session_time + seconds);
        self.status = CpuStatus::Waiting;
    }

    pub fn end_wait(&mut self) {
        self.wait_until = None;
        self.status = CpuStatus::Running;
    }

    /// Nothing left to do until new code arrives.
    pub fn is_idle(&self) -> bool {
        let Some(ctx) = self.contexts.last() else { return true };
        self.contexts.len() == 1
            && self.status == CpuStatus::Running
            && ctx.triggers().is_empty()
            && ctx.current().map_or(true, |op| op.op == Op::Eof)
    }

    /// One host tick. `delta` is the elapsed time in seconds.
    pub fn update(&mut self, delta: f64) {
        let started = Instant::now();
        self.session_time += delta;

        for e in self.bindings.pre_update() {
            self.report_error(&KosError::Host(e));
        }
        self.vars.refresh_bound();

        let triggers_started = Instant::now();
        self.process_triggers();
        self.stats.trigger_time += triggers_started.elapsed();

        self.process_wait();

        let execution_started = Instant::now();
        self.continue_execution();
        self.stats.execution_time += execution_started.elapsed();

        if let Err(e) = self.vars.flush() {
            self.report_error(&e);
        }
        self.stats.update_time += started.elapsed();
    }

    fn process_triggers(&mut self) {
        let Some(ctx) = self.contexts.last() else { return };
        let triggers = ctx.triggers().to_vec();
        if triggers.is_empty() {
            return;
        }
        let depth = self.contexts.len();
        let saved_ip = ctx.ip;

        for pointer in triggers {
            let Some(ctx) = self.contexts.last_mut() else { break };
            // An earlier trigger may have removed this one.
            if !ctx.triggers().contains(&pointer) {
                continue;
            }
            ctx.ip = pointer;
            let mark = self.stack.mark();
            match self.run_trigger(depth) {
                Err(e) => {
                    log::error!("trigger at {pointer} failed and was removed: {e}");
                    if let Some(ctx) = self.contexts.get_mut(depth - 1) {
                        ctx.remove_trigger(pointer);
                    }
                    self.report_error(&e);
                    self.stack.restore(mark);
                }
                Ok(()) if self.contexts.len() != depth => {
                    log::debug!("trigger at {pointer} changed the context depth, ending the trigger pass");
                    self.stack.restore(mark);
                }
                Ok(()) => {}
            }
            if self.contexts.len() != depth {
                break;
            }
        }

        // The context that ran the triggers may no longer be on top.
        if let Some(ctx) = self.contexts.get_mut(depth - 1) {
            ctx.ip = saved_ip;
        }
    }

    /// Run a trigger body until it halts or pushes or pops a context.
    fn run_trigger(&mut self, depth: usize) -> Result<()> {
        loop {
            if self.execute_instruction()? == ExecOutcome::Halt || self.contexts.len() != depth {
                return Ok(());
            }
        }
    }

    fn process_wait(&mut self) {
        if self.status != CpuStatus::Waiting {
            return;
        }
        if let Some(until) = self.wait_until {
            if self.session_time >= until {
                self.end_wait();
            }
        }
    }

    fn continue_execution(&mut self) {
        let mut budget = self.config.instructions_per_update;
        while budget > 0 && self.status == CpuStatus::Running && !self.contexts.is_empty() {
            budget -= 1;
            match self.execute_instruction() {
                Ok(ExecOutcome::Step(_)) => {}
                Ok(ExecOutcome::Halt | ExecOutcome::Yield) => break,
                Err(e) => {
                    self.handle_main_error(&e);
                    break;
                }
            }
        }
    }

    fn handle_main_error(&mut self, e: &KosError) {
        log::error!("{e}");
        if let Ok(ctx) = self.current_context() {
            log::debug!("\n{}", ctx.code_fragment(3).join("\n"));
        }
        log::debug!("{}", self.stack.dump(self.config.stack_dump_lines));
        self.report_error(e);
        self.stack.clear();

        if self.contexts.len() == 1 {
            if let Some(interpreter) = self.contexts.last_mut() {
                interpreter.skip_current_statement();
            }
        } else {
            self.end_wait();
            self.pop_first_context();
        }
    }

    fn report_error(&mut self, e: &KosError) {
        self.print(&e.to_string());
    }

    fn print_statistics(&mut self) {
        if self.config.show_statistics {
            let ms = |d: Duration| d.as_secs_f64() * 1000.0;
            let stats = self.stats;
            self.print(&format!("Total update time: {:.3}ms", ms(stats.update_time)));
            self.print(&format!("Total triggers time: {:.3}ms", ms(stats.trigger_time)));
            self.print(&format!("Total execution time: {:.3}ms", ms(stats.execution_time)));
            self.print(&format!("Total instructions: {}", stats.instructions));
        }
        self.stats = Statistics::default();
    }

    /// Fetch and run the opcode under the pointer of the top context.
    fn execute_instruction(&mut self) -> Result<ExecOutcome> {
        let index = self.contexts.len().checked_sub(1).ok_or(KosError::NoContext)?;
        let ctx = &self.contexts[index];
        let program = Rc::clone(ctx.program());
        let ip = ctx.ip;
        // A shell that has never been given a command has nothing to run.
        if program.is_empty() {
            return Ok(ExecOutcome::Halt);
        }
        let opcode = program.get(ip).ok_or(KosError::IpOutOfRange { ip, len: program.len() })?;

        log::trace!("{ip:04} {opcode}");
        self.stats.instructions += 1;
        let outcome = self.step(ip, opcode)?;
        let delta = match outcome {
            ExecOutcome::Step(d) => d,
            ExecOutcome::Yield => 1,
            ExecOutcome::Halt => return Ok(outcome),
        };
        let next = ip as isize + delta;
        // A host function may have pushed or popped a context; the pointer moves
        // on the one that ran the opcode.
        let Some(ctx) = self.contexts.get_mut(index) else {
            return Ok(outcome);
        };
        if next < 0 {
            return Err(KosError::IpOutOfRange { ip, len: ctx.len() });
        }
        ctx.ip = next as usize;
        Ok(outcome)
    }

    /// Pop and resolve identifiers through the variable table.
    fn pop_value(&mut self) -> Result<Value> {
        let raw = self.stack.pop()?;
        self.resolve(raw)
    }

    fn resolve(&mut self, value: Value) -> Result<Value> {
        match value {
            Value::Identifier(name) => self.vars.get(&name),
            other => Ok(other),
        }
    }

    fn pop_arguments(&mut self) -> Result<Vec<Value>> {
        let raw = self.stack.pop_arguments()?;
        raw.into_iter().map(|v| self.resolve(v)).collect()
    }

    fn resolve_suffix(&self, name: Value, object: Value) -> Result<(String, Suffix)> {
        let name = name.to_string().to_uppercase();
        let Value::Structure(object) = object else {
            return Err(KosError::NotSuffixed(object.type_name().to_string()));
        };
        let suffix = self.suffixes.resolve(&object, &name)?;
        Ok((name, suffix))
    }

    fn pop_index(&mut self) -> Result<i32> {
        match self.pop_value()? {
            v @ (Value::Int(_) | Value::Double(_)) => v.to_int(),
            _ => Err(KosError::IndexNotInteger),
        }
    }

    fn pop_pointer(&mut self) -> Result<usize> {
        let value = self.pop_value()?;
        let pointer = value.to_int().map_err(|_| KosError::ExpectedFunctionPointer(value.type_name().to_string()))?;
        usize::try_from(pointer).map_err(|_| KosError::ExpectedFunctionPointer(value.to_string()))
    }

    fn with_indexable<R>(container: &Value, f: impl FnOnce(&dyn crate::suffix::Indexable) -> Result<R>) -> Result<R> {
        container
            .as_structure()
            .and_then(|s| s.as_indexable())
            .map_or_else(|| Err(KosError::NotIndexable(container.type_name().to_string())), f)
    }

    fn binary(&mut self, op: Operator) -> Result<ExecOutcome> {
        let right = self.pop_value()?;
        let left = self.pop_value()?;
        self.stack.push(calculate(op, left, right)?)?;
        Ok(ExecOutcome::Step(1))
    }

    fn call(&mut self, ip: usize, destination: &Value) -> Result<ExecOutcome> {
        let destination = match destination {
            Value::Identifier(name) => self.vars.get(name)?,
            other => other.clone(),
        };
        match destination {
            Value::Int(address) => {
                self.stack.push_above(Value::ReturnAddress(ip + 1))?;
                Ok(ExecOutcome::Step(address as isize - ip as isize))
            }
            Value::String(name) => {
                let args = self.pop_arguments()?;
                let functions = Rc::clone(&self.functions);
                let result = functions.get(&name)?.invoke(self, args)?;
                self.stack.push(result)?;
                Ok(ExecOutcome::Step(1))
            }
            Value::Delegate(callable) => {
                let args = self.pop_arguments()?;
                self.stack.push(callable.invoke(args)?)?;
                Ok(ExecOutcome::Step(1))
            }
            other => Err(KosError::ExpectedFunctionPointer(other.type_name().to_string())),
        }
    }

    /// Execute a single opcode.
    fn step(&mut self, ip: usize, opcode: &Opcode) -> Result<ExecOutcome> {
        use Op::*;

        match &opcode.op {
            Eof => Ok(ExecOutcome::Halt),
            Eop => {
                log::warn!("end of program reached at {ip}");
                self.break_execution(false);
                Ok(ExecOutcome::Halt)
            }
            Nop => Ok(ExecOutcome::Step(1)),

            Store => {
                let value = self.pop_value()?;
                match self.stack.pop()? {
                    Value::Identifier(name) => self.vars.set(&name, value)?,
                    other => return Err(KosError::ExpectedIdentifier(other.type_name().to_string())),
                }
                Ok(ExecOutcome::Step(1))
            }
            Unset => {
                match self.stack.pop()? {
                    Value::Identifier(name) => {
                        if !self.vars.remove(&name) {
                            log::debug!("unset {name}: not a removable variable");
                        }
                    }
                    Value::Nil => self.vars.remove_all_plain(),
                    other => return Err(KosError::ExpectedIdentifier(other.type_name().to_string())),
                }
                Ok(ExecOutcome::Step(1))
            }

            GetMember => {
                let name = self.pop_value()?;
                let object = self.pop_value()?;
                let (_, suffix) = self.resolve_suffix(name, object)?;
                self.stack.push(suffix.read()?)?;
                Ok(ExecOutcome::Step(1))
            }
            GetMethod => {
                let name = self.pop_value()?;
                let object = self.pop_value()?;
                let (_, suffix) = self.resolve_suffix(name, object)?;
                self.stack.push(Value::Delegate(suffix.into_callable()))?;
                Ok(ExecOutcome::Step(1))
            }
            SetMember => {
                let value = self.pop_value()?;
                let name = self.pop_value()?;
                let object = self.pop_value()?;
                let (name, suffix) = self.resolve_suffix(name, object)?;
                suffix.write(&name, value)?;
                Ok(ExecOutcome::Step(1))
            }
            GetIndex => {
                let index = self.pop_index()?;
                let container = self.pop_value()?;
                let value = Self::with_indexable(&container, |c| c.get_index(index))?;
                self.stack.push(value)?;
                Ok(ExecOutcome::Step(1))
            }
            SetIndex => {
                let value = self.pop_value()?;
                let index = self.pop_index()?;
                let container = self.pop_value()?;
                Self::with_indexable(&container, |c| c.set_index(index, value))?;
                Ok(ExecOutcome::Step(1))
            }

            BranchFalse(distance) => {
                let condition = self.pop_value()?.to_bool()?;
                Ok(ExecOutcome::Step(if condition { 1 } else { *distance }))
            }
            Jump(distance) => Ok(ExecOutcome::Step(*distance)),

            Negate => {
                let value = match self.pop_value()? {
                    Value::Int(i) => i.checked_neg().map_or(Value::Double(-(i as f64)), Value::Int),
                    Value::Double(d) => Value::Double(-d),
                    Value::Structure(s) => match s.try_operation(Operator::Multiply, &Value::Int(-1), true) {
                        Some(result) => result?,
                        None => {
                            return Err(KosError::CannotNegate {
                                value: s.to_string(),
                                type_name: s.type_name().to_string(),
                            })
                        }
                    },
                    other => {
                        return Err(KosError::CannotNegate {
                            value: other.to_string(),
                            type_name: other.type_name().to_string(),
                        })
                    }
                };
                self.stack.push(value)?;
                Ok(ExecOutcome::Step(1))
            }
            Bool => {
                let b = self.pop_value()?.to_bool()?;
                self.stack.push(Value::Bool(b))?;
                Ok(ExecOutcome::Step(1))
            }
            Not => {
                let value = match self.pop_value()? {
                    Value::Bool(b) => Value::Bool(!b),
                    Value::Int(i) => Value::Int(i32::from(i == 0)),
                    Value::Double(d) => Value::Double(if d == 0.0 { 1.0 } else { 0.0 }),
                    other => Value::Bool(!other.to_bool()?),
                };
                self.stack.push(value)?;
                Ok(ExecOutcome::Step(1))
            }
            And | Or => {
                let right = self.pop_value()?.to_bool()?;
                let left = self.pop_value()?.to_bool()?;
                let result = if matches!(opcode.op, And) { left && right } else { left || right };
                self.stack.push(Value::Bool(result))?;
                Ok(ExecOutcome::Step(1))
            }

            Call(destination) => self.call(ip, destination),
            CallMethod => {
                let args = self.pop_arguments()?;
                match self.pop_value()? {
                    Value::Delegate(callable) => {
                        self.stack.push(callable.invoke(args)?)?;
                        Ok(ExecOutcome::Step(1))
                    }
                    other => Err(KosError::NotCallable(other.type_name().to_string())),
                }
            }
            Return => {
                self.stack.move_pointer(1);
                match self.stack.pop() {
                    Ok(Value::ReturnAddress(back)) => Ok(ExecOutcome::Step(back as isize - ip as isize)),
                    _ => Err(KosError::StackMisalignment),
                }
            }

            Push(value) => {
                self.stack.push(value.clone())?;
                Ok(ExecOutcome::Step(1))
            }
            Pop => {
                self.stack.pop()?;
                Ok(ExecOutcome::Step(1))
            }
            Dup => {
                let top = self.stack.peek().cloned().ok_or(KosError::StackUnderflow)?;
                self.stack.push(top)?;
                Ok(ExecOutcome::Step(1))
            }
            Swap => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a)?;
                self.stack.push(b)?;
                Ok(ExecOutcome::Step(1))
            }

            AddTrigger(should_wait) => {
                let pointer = self.pop_pointer()?;
                self.current_context_mut()?.add_trigger(pointer);
                if *should_wait {
                    self.start_wait(0.0);
                }
                Ok(ExecOutcome::Step(1))
            }
            RemoveTrigger => {
                let pointer = self.pop_pointer()?;
                self.current_context_mut()?.remove_trigger(pointer);
                Ok(ExecOutcome::Step(1))
            }
            Wait => {
                let value = self.pop_value()?;
                let seconds = value.as_f64().ok_or_else(|| value.cast_error("Double"))?;
                self.start_wait(seconds);
                Ok(ExecOutcome::Yield)
            }
            EndWait => {
                self.end_wait();
                Ok(ExecOutcome::Step(1))
            }

            Add => self.binary(Operator::Add),
            Sub => self.binary(Operator::Subtract),
            Mult => self.binary(Operator::Multiply),
            Div => self.binary(Operator::Divide),
            Pow => self.binary(Operator::Power),
            Gt => self.binary(Operator::GreaterThan),
            Lt => self.binary(Operator::LessThan),
            Gte => self.binary(Operator::GreaterOrEqual),
            Lte => self.binary(Operator::LessOrEqual),
            Eq => self.binary(Operator::Equal),
            Ne => self.binary(Operator::NotEqual),
            Min => self.binary(Operator::Min),
            Max => self.binary(Operator::Max),
        }
    }
}
