//! Synthetic HPROF streams for tests.

use bytes::{BufMut, BytesMut};

pub(crate) const FORMAT: &str = "JAVA PROFILE 1.0.2";

fn put_id(buf: &mut BytesMut, id_size: u32, value: u64) {
    match id_size {
        4 => buf.put_u32(value as u32),
        8 => buf.put_u64(value),
        other => panic!("fixture id size {} unsupported", other),
    }
}

/// Builds a whole dump: header followed by top-level records
pub(crate) struct DumpBuilder {
    buf: BytesMut,
    id_size: u32,
}

impl DumpBuilder {
    pub(crate) fn new(id_size: u32) -> Self {
        let mut buf = BytesMut::new();
        buf.put_slice(FORMAT.as_bytes());
        buf.put_u8(0);
        buf.put_u32(id_size);
        buf.put_u64(0x0000_0172_3B6E_2A10);
        Self { buf, id_size }
    }

    pub(crate) fn heap(&self) -> HeapBuilder {
        HeapBuilder {
            buf: BytesMut::new(),
            id_size: self.id_size,
        }
    }

    pub(crate) fn record(mut self, tag: u8, body: &[u8]) -> Self {
        self.buf.put_u8(tag);
        self.buf.put_u32(0x10);
        self.buf.put_u32(body.len() as u32);
        self.buf.put_slice(body);
        self
    }

    /// Record header declaring `declared` body bytes, followed by `body`
    pub(crate) fn record_with_length(mut self, tag: u8, declared: u32, body: &[u8]) -> Self {
        self.buf.put_u8(tag);
        self.buf.put_u32(0);
        self.buf.put_u32(declared);
        self.buf.put_slice(body);
        self
    }

    pub(crate) fn utf8(self, id: u64, text: &str) -> Self {
        let mut body = BytesMut::new();
        put_id(&mut body, self.id_size, id);
        body.put_slice(text.as_bytes());
        self.record(0x01, &body)
    }

    pub(crate) fn build(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Builds the body of a heap dump record
pub(crate) struct HeapBuilder {
    buf: BytesMut,
    id_size: u32,
}

impl HeapBuilder {
    fn id(&mut self, value: u64) {
        put_id(&mut self.buf, self.id_size, value);
    }

    pub(crate) fn root_unknown(mut self, id: u64) -> Self {
        self.buf.put_u8(0xFF);
        self.id(id);
        self
    }

    pub(crate) fn root_jni_global(mut self, id: u64, global_ref: u64) -> Self {
        self.buf.put_u8(0x01);
        self.id(id);
        self.id(global_ref);
        self
    }

    pub(crate) fn root_jni_local(mut self, id: u64, thread: u32, frame: u32) -> Self {
        self.buf.put_u8(0x02);
        self.id(id);
        self.buf.put_u32(thread);
        self.buf.put_u32(frame);
        self
    }

    pub(crate) fn root_java_frame(mut self, id: u64, thread: u32, frame: u32) -> Self {
        self.buf.put_u8(0x03);
        self.id(id);
        self.buf.put_u32(thread);
        self.buf.put_u32(frame);
        self
    }

    pub(crate) fn root_native_stack(mut self, id: u64, thread: u32) -> Self {
        self.buf.put_u8(0x04);
        self.id(id);
        self.buf.put_u32(thread);
        self
    }

    pub(crate) fn root_sticky_class(mut self, id: u64) -> Self {
        self.buf.put_u8(0x05);
        self.id(id);
        self
    }

    pub(crate) fn root_thread_block(mut self, id: u64, thread: u32) -> Self {
        self.buf.put_u8(0x06);
        self.id(id);
        self.buf.put_u32(thread);
        self
    }

    pub(crate) fn root_monitor_used(mut self, id: u64) -> Self {
        self.buf.put_u8(0x07);
        self.id(id);
        self
    }

    pub(crate) fn root_thread_object(mut self, id: u64, thread: u32, trace: u32) -> Self {
        self.buf.put_u8(0x08);
        self.id(id);
        self.buf.put_u32(thread);
        self.buf.put_u32(trace);
        self
    }

    /// Class dump with the given constant pool, static fields and instance
    /// field descriptors
    pub(crate) fn class_dump(
        mut self,
        id: u64,
        constants: &[(u16, u8, Vec<u8>)],
        statics: &[(u64, u8, Vec<u8>)],
        fields: &[(u64, u8)],
    ) -> Self {
        self.buf.put_u8(0x20);
        self.id(id);
        self.buf.put_u32(1);
        for slot in 0..6 {
            self.id(slot * 0x10);
        }
        self.buf.put_u32(24);
        self.buf.put_u16(constants.len() as u16);
        for (index, ty, value) in constants {
            self.buf.put_u16(*index);
            self.buf.put_u8(*ty);
            self.buf.put_slice(value);
        }
        self.buf.put_u16(statics.len() as u16);
        for (name, ty, value) in statics {
            self.id(*name);
            self.buf.put_u8(*ty);
            self.buf.put_slice(value);
        }
        self.buf.put_u16(fields.len() as u16);
        for (name, ty) in fields {
            self.id(*name);
            self.buf.put_u8(*ty);
        }
        self
    }

    pub(crate) fn instance_dump(mut self, id: u64, class: u64, data: &[u8]) -> Self {
        self.buf.put_u8(0x21);
        self.id(id);
        self.buf.put_u32(1);
        self.id(class);
        self.buf.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        self
    }

    pub(crate) fn object_array(mut self, id: u64, class: u64, elements: &[u64]) -> Self {
        self.buf.put_u8(0x22);
        self.id(id);
        self.buf.put_u32(1);
        self.buf.put_u32(elements.len() as u32);
        self.id(class);
        for element in elements {
            self.id(*element);
        }
        self
    }

    pub(crate) fn primitive_array(mut self, id: u64, ty: u8, count: u32, data: &[u8]) -> Self {
        self.buf.put_u8(0x23);
        self.id(id);
        self.buf.put_u32(1);
        self.buf.put_u32(count);
        self.buf.put_u8(ty);
        self.buf.put_slice(data);
        self
    }

    pub(crate) fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.put_slice(bytes);
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// UTF-16BE encoding of `text`, as stored in a `char[]`
pub(crate) fn utf16be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}
