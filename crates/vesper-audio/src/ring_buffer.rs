use rtrb::{Consumer, Producer, RingBuffer};

/// Lock-free SPSC sample queue between the cpal callback and the
/// chunker task, built on rtrb so the audio callback never allocates
/// or blocks.
pub struct SampleRingBuffer {
    producer: Producer<i16>,
    consumer: Consumer<i16>,
}

impl SampleRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    pub fn split(self) -> (SampleProducer, SampleConsumer) {
        (
            SampleProducer {
                producer: self.producer,
            },
            SampleConsumer {
                consumer: self.consumer,
            },
        )
    }
}

/// Producer half, owned by the audio callback.
pub struct SampleProducer {
    producer: Producer<i16>,
}

impl SampleProducer {
    /// Write as many samples as fit and return how many were accepted.
    /// Real-time audio cannot be paused, so a full buffer sheds the
    /// remainder instead of blocking the device driver.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        let writable = samples.len().min(self.producer.slots());
        if writable == 0 {
            return 0;
        }
        let mut chunk = match self.producer.write_chunk(writable) {
            Ok(chunk) => chunk,
            Err(_) => return 0,
        };

        // The chunk may wrap around the end of the buffer.
        let (first, second) = chunk.as_mut_slices();
        let split = first.len();
        first.copy_from_slice(&samples[..split]);
        if !second.is_empty() {
            second.copy_from_slice(&samples[split..split + second.len()]);
        }
        chunk.commit_all();
        writable
    }

    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

/// Consumer half, owned by the chunker task.
pub struct SampleConsumer {
    consumer: Consumer<i16>,
}

impl SampleConsumer {
    /// Read up to `buffer.len()` samples, returning the count read.
    pub fn read(&mut self, buffer: &mut [i16]) -> usize {
        let available = buffer.len().min(self.consumer.slots());
        if available == 0 {
            return 0;
        }
        let chunk = match self.consumer.read_chunk(available) {
            Ok(chunk) => chunk,
            Err(_) => return 0,
        };

        let len = chunk.len();
        let (first, second) = chunk.as_slices();
        let split = first.len();
        buffer[..split].copy_from_slice(first);
        if !second.is_empty() {
            buffer[split..split + second.len()].copy_from_slice(second);
        }
        chunk.commit_all();
        len
    }

    pub fn slots(&self) -> usize {
        self.consumer.slots()
    }
}
