use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::{
    elements::{basic::SwitchConfig, check_missed, Context, Effects, NetworkElement},
    ident::{ElementId, EndpointId},
    message::{Message, Transit},
    port::{PortIndex, PortMap, Ports},
    queue::{self, TimedQueue},
    time::{Delta, Time},
    Error,
};

impl SwitchConfig {
    pub(crate) fn build_crossbar<P>(&self, id: ElementId) -> Result<CrossbarSwitch<P>, Error> {
        self.validate(&format!("crossbar {id}"))?;
        Ok(CrossbarSwitch {
            id,
            ports: self.port_map(),
            input_delay: self.input_buffer_delay.into_delta(),
            fabric_delay: self.switch_fabric_delay.into_delta(),
            output_delay: self.output_buffer_delay.into_delta(),
            inputs: Ports::new(self.nr_ports),
            waiting: Ports::new(self.nr_ports),
            fabric: Ports::new(self.nr_ports),
            outputs: Ports::new(self.nr_ports),
            matrix: ContentionMatrix::new(self.nr_ports),
        })
    }
}

/// Crosspoint occupancy: `free[i][o]` is false while a transfer from input `i` to output `o` is
/// inside the fabric.
#[derive(Debug, Clone)]
struct ContentionMatrix {
    nr_ports: usize,
    free: Vec<bool>,
}

impl ContentionMatrix {
    fn new(nr_ports: usize) -> Self {
        Self {
            nr_ports,
            free: vec![true; nr_ports * nr_ports],
        }
    }

    fn at(&self, input: usize, output: usize) -> bool {
        self.free[input * self.nr_ports + output]
    }

    fn set(&mut self, input: PortIndex, output: PortIndex, free: bool) {
        self.free[input.inner() * self.nr_ports + output.inner()] = free;
    }

    /// A transfer needs its whole input row and output column to be idle.
    fn is_clear(&self, input: PortIndex, output: PortIndex) -> bool {
        (0..self.nr_ports).all(|j| self.at(j, output.inner()) && self.at(input.inner(), j))
    }

    fn claim(&mut self, input: PortIndex, output: PortIndex) {
        self.set(input, output, false);
    }

    fn release(&mut self, input: PortIndex, output: PortIndex) {
        self.set(input, output, true);
    }

    fn reset(&mut self) {
        self.free.fill(true);
    }
}

#[derive(Debug)]
struct Crossing<P> {
    input: PortIndex,
    transit: Transit<P>,
}

/// A switch whose fabric is a crossbar.
///
/// Transfers between disjoint port pairs cross the fabric in parallel. A transfer whose input
/// row or output column is occupied waits in a per-input queue and is retried on every
/// processing step; this is flow control, not an error.
#[derive(Debug)]
pub struct CrossbarSwitch<P> {
    id: ElementId,
    ports: PortMap,
    input_delay: Delta,
    fabric_delay: Delta,
    output_delay: Delta,

    inputs: Ports<TimedQueue<Transit<P>>>,
    // Blocked transfers carry no due time; an occupied crosspoint always has a fabric entry whose
    // wake-up will retry them.
    waiting: Ports<VecDeque<Transit<P>>>,
    // One fabric queue per output port
    fabric: Ports<TimedQueue<Crossing<P>>>,
    outputs: Ports<TimedQueue<Transit<P>>>,
    matrix: ContentionMatrix,
}

impl<P> CrossbarSwitch<P> {
    fn admit(&mut self, input: PortIndex, output: PortIndex, transit: Transit<P>, now: Time) {
        self.matrix.claim(input, output);
        let fabric = &mut self.fabric[output];
        let due = fabric.tail_or(now) + self.fabric_delay;
        trace!(element = %self.id, %input, %output, due = %due, "crossing fabric");
        fabric.push(due, Crossing { input, transit });
    }

    fn drain_fabric(&mut self, now: Time) {
        for output in self.fabric.indices() {
            while let Some(Crossing { input, transit }) = self.fabric[output].pop_due(now) {
                self.matrix.release(input, output);
                let queue = &mut self.outputs[output];
                let due = queue.tail_or(now) + self.output_delay;
                queue.push(due, transit);
            }
        }
    }

    fn admit_inputs(&mut self, now: Time) -> Result<(), Error> {
        for input in self.inputs.indices() {
            // Retry parked transfers first, in arrival order
            while let Some(transit) = self.waiting[input].front() {
                let output = self.ports.output(transit.dest)?;
                if !self.matrix.is_clear(input, output) {
                    break;
                }
                if let Some(transit) = self.waiting[input].pop_front() {
                    self.admit(input, output, transit, now);
                }
            }
            while let Some(transit) = self.inputs[input].peek_due(now) {
                let output = self.ports.output(transit.dest)?;
                let Some(transit) = self.inputs[input].pop_due(now) else {
                    break;
                };
                if self.waiting[input].is_empty() && self.matrix.is_clear(input, output) {
                    self.admit(input, output, transit, now);
                } else {
                    trace!(element = %self.id, %input, %output, "blocked by contention");
                    self.waiting[input].push_back(transit);
                }
            }
        }
        Ok(())
    }

    fn queues(&self) -> impl Iterator<Item = &TimedQueue<Transit<P>>> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Number of transfers parked behind an occupied crosspoint.
    pub fn blocked(&self) -> usize {
        self.waiting.iter().map(VecDeque::len).sum()
    }
}

impl<P> NetworkElement<P> for CrossbarSwitch<P> {
    fn id(&self) -> ElementId {
        self.id
    }

    fn accept(
        &mut self,
        dest: EndpointId,
        msg: Message<P>,
        now: Time,
    ) -> Result<Effects<P>, Error> {
        let ctx = Context::new(now);
        let port = self.ports.input(msg.source)?;
        let queue = &mut self.inputs[port];
        let due = queue.tail_or(now) + self.input_delay;
        debug!(element = %self.id, %port, %dest, due = %due, "crossbar accepted");
        queue.push(due, Transit::new(dest, msg));
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn process(&mut self, now: Time) -> Result<Effects<P>, Error> {
        check_missed(self.id, self.next_wakeup(), now);
        let mut ctx = Context::new(now);

        // Draining the fabric first frees crosspoints for this step's admissions
        self.drain_fabric(now);
        self.admit_inputs(now)?;

        for output in self.outputs.iter_mut() {
            while let Some(transit) = output.pop_due(now) {
                debug!(element = %self.id, dest = %transit.dest, at = %now, "crossbar delivered");
                ctx.deliver(transit);
            }
        }

        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn reset(&mut self) {
        self.inputs.iter_mut().for_each(TimedQueue::clear);
        self.waiting.iter_mut().for_each(VecDeque::clear);
        self.fabric.iter_mut().for_each(TimedQueue::clear);
        self.outputs.iter_mut().for_each(TimedQueue::clear);
        self.matrix.reset();
    }

    fn next_wakeup(&self) -> Option<Time> {
        let fabric = queue::next_wakeup(self.fabric.iter());
        let rest = queue::next_wakeup(self.queues());
        fabric.into_iter().chain(rest).min()
    }
}
