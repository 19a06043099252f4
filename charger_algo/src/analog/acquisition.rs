// Hand-off of raw ADC vectors from the acquisition interrupt to the main loop.

// Key Features:
// - One `RawSamples` vector per acquisition tick, all physical channels at once
// - Lock-free single-producer/single-consumer queue, the interrupt never blocks
// - A full queue drops the newest vector and counts it instead of overwriting
//   data the consumer may be reading

// Detailed Operation:
// The queue is split once at startup. The producer half is owned by the
// acquisition interrupt and pushes complete vectors; the consumer half is
// owned by the main loop, which drains everything queued once per pass and
// feeds it to `AnalogInputs::drain`. A vector is copied into the queue slot
// before the slot is published, so the consumer only ever sees whole vectors.

// Licensed under the Apache License, Version 2.0

use heapless::spsc::{Consumer, Producer, Queue};

use crate::channel::{Name, PHYSICAL_INPUTS};
use crate::Value;

/// Raw readings of every physical channel taken in one acquisition tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSamples {
    values: [Value; PHYSICAL_INPUTS],
}

impl RawSamples {
    /// Wraps a vector ordered like `Name::physical()`.
    pub const fn new(values: [Value; PHYSICAL_INPUTS]) -> Self {
        Self { values }
    }

    /// Same raw value on every channel.
    pub const fn splat(value: Value) -> Self {
        Self {
            values: [value; PHYSICAL_INPUTS],
        }
    }

    /// Raw value of a physical channel; virtual channels read 0.
    #[inline(always)]
    pub fn get(&self, name: Name) -> Value {
        self.values.get(name.index()).copied().unwrap_or(0)
    }

    /// Sets the raw value of a physical channel; virtual channels are ignored.
    pub fn set(&mut self, name: Name, value: Value) {
        if let Some(slot) = self.values.get_mut(name.index()) {
            *slot = value;
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: Name, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// The whole vector.
    pub fn values(&self) -> &[Value; PHYSICAL_INPUTS] {
        &self.values
    }
}

/// Queue storage; holds `N - 1` vectors.
pub type SampleQueue<const N: usize> = Queue<RawSamples, N>;

/// Interrupt side of the queue.
pub struct SampleProducer<'a, const N: usize> {
    inner: Producer<'a, RawSamples, N>,
    dropped: u32,
}

/// Main loop side of the queue.
pub struct SampleConsumer<'a, const N: usize> {
    inner: Consumer<'a, RawSamples, N>,
}

/// Splits queue storage into its two halves.
pub fn split<const N: usize>(
    queue: &mut SampleQueue<N>,
) -> (SampleProducer<'_, N>, SampleConsumer<'_, N>) {
    let (inner_p, inner_c) = queue.split();
    (
        SampleProducer {
            inner: inner_p,
            dropped: 0,
        },
        SampleConsumer { inner: inner_c },
    )
}

impl<'a, const N: usize> SampleProducer<'a, N> {
    /// Queues one vector; returns false (and counts it) when the queue is full.
    pub fn push(&mut self, samples: RawSamples) -> bool {
        match self.inner.enqueue(samples) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.wrapping_add(1);
                false
            }
        }
    }

    /// Number of vectors lost to a full queue.
    #[inline(always)]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<'a, const N: usize> SampleConsumer<'a, N> {
    /// Takes the oldest queued vector.
    #[inline(always)]
    pub fn pop(&mut self) -> Option<RawSamples> {
        self.inner.dequeue()
    }

    /// Number of vectors waiting.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
