// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binder transaction decoding for callback services only reachable as a
// raw cross-process interface.
//
// A transaction arrives as a method ordinal plus marshalled arguments. The
// ordinal-to-method table is data, not code: the native side can read the
// real ordinals from the SDK's generated stub and override the defaults.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use wxtpush_bridge::traits::SdkRuntime;
use wxtpush_core::error::{PushError, Result};
use wxtpush_core::ArgValue;

/// 'SYST' marker written after the work-source uid on API 30+.
const SYSTEM_HEADER: i32 = 0x5359_5354;

/// Interface-token header layouts, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderLayout {
    /// Strict-mode policy only.
    Legacy,
    /// Policy and work-source uid.
    Api29,
    /// Policy, work-source uid and the system header marker.
    Api30,
}

impl HeaderLayout {
    const ALL: [HeaderLayout; 3] = [HeaderLayout::Api30, HeaderLayout::Api29, HeaderLayout::Legacy];

    fn words(self) -> usize {
        match self {
            HeaderLayout::Legacy => 1,
            HeaderLayout::Api29 => 2,
            HeaderLayout::Api30 => 3,
        }
    }
}

/// Cursor over a little-endian parcel buffer.
#[derive(Debug, Clone)]
pub struct ParcelReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ParcelReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(PushError::InvalidArguments(format!(
                "parcel truncated at offset {} (need {n} bytes, have {})",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Length-prefixed UTF-16 string; a length of -1 is null.
    pub fn read_string16(&mut self) -> Result<Option<String>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        let len = len as usize;
        // Characters plus the NUL terminator, padded to 4 bytes. A hostile
        // length must not wrap on 32-bit targets.
        let padded = len
            .checked_add(1)
            .and_then(|n| n.checked_mul(2))
            .and_then(|n| n.checked_add(3))
            .map(|n| n & !3)
            .ok_or_else(|| {
                PushError::InvalidArguments(format!("parcel string length {len} out of range"))
            })?;
        let bytes = self.take(padded)?;
        let units: Vec<u16> = bytes[..len * 2]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16(&units)
            .map(Some)
            .map_err(|e| PushError::InvalidArguments(format!("invalid UTF-16 in parcel: {e}")))
    }

    /// Consume the interface token and return the descriptor that matched.
    ///
    /// The header layout depends on the sender's API level, so each known
    /// layout is tried until the descriptor reads back as one of `accepted`.
    pub fn enforce_interface(&mut self, accepted: &[&'static str]) -> Result<&'static str> {
        let start = self.pos;
        for layout in HeaderLayout::ALL {
            self.pos = start;
            if self.skip_header(layout).is_err() {
                continue;
            }
            if let Ok(Some(descriptor)) = self.read_string16() {
                if let Some(found) = accepted.iter().find(|d| **d == descriptor) {
                    return Ok(*found);
                }
            }
        }
        self.pos = start;
        Err(PushError::InvalidArguments(
            "parcel interface descriptor not recognised".into(),
        ))
    }

    fn skip_header(&mut self, layout: HeaderLayout) -> Result<()> {
        for word in 0..layout.words() {
            let v = self.read_i32()?;
            if layout == HeaderLayout::Api30 && word == 2 && v != SYSTEM_HEADER {
                return Err(PushError::InvalidArguments("missing system header".into()));
            }
        }
        Ok(())
    }
}

/// Builds parcels in the same layout the reader expects.
#[derive(Debug, Clone, Default)]
pub struct ParcelWriter {
    data: Vec<u8>,
}

impl ParcelWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_string16(&mut self, s: Option<&str>) -> &mut Self {
        let Some(s) = s else {
            return self.write_i32(-1);
        };
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_i32(units.len() as i32);
        let start = self.data.len();
        for u in units.iter().copied().chain(std::iter::once(0)) {
            self.data.extend_from_slice(&u.to_le_bytes());
        }
        while (self.data.len() - start) % 4 != 0 {
            self.data.push(0);
        }
        self
    }

    /// API 30 interface token.
    pub fn write_interface_token(&mut self, descriptor: &str) -> &mut Self {
        self.write_i32(0)
            .write_i32(-1)
            .write_i32(SYSTEM_HEADER)
            .write_string16(Some(descriptor))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Marshalled type of one transaction argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Int,
    Str,
}

/// One method of a transaction interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    pub code: u32,
    pub name: &'static str,
    pub args: &'static [ArgKind],
}

/// Ordinal-to-method table for one callback interface.
#[derive(Debug, Clone)]
pub struct MethodTable {
    descriptors: &'static [&'static str],
    methods: BTreeMap<u32, MethodSpec>,
}

const HEYTAP_DESCRIPTORS: &[&str] = &[
    "com.heytap.msp.push.callback.ICallBackResultService",
    "com.coloros.mcssdk.callback.ICallBackResultService",
];

const HEYTAP_METHODS: &[(u32, &str, &[ArgKind])] = &[
    (1, "onRegister", &[ArgKind::Int, ArgKind::Str, ArgKind::Str]),
    (2, "onUnRegister", &[ArgKind::Int, ArgKind::Str]),
    (3, "onSetPushTime", &[ArgKind::Int, ArgKind::Str]),
    (4, "onGetPushStatus", &[ArgKind::Int, ArgKind::Int, ArgKind::Str]),
    (5, "onGetNotificationStatus", &[ArgKind::Int, ArgKind::Int, ArgKind::Str]),
];

impl MethodTable {
    /// Heytap `ICallBackResultService`, default ordinals in declaration
    /// order.
    pub fn heytap() -> Self {
        let methods = HEYTAP_METHODS
            .iter()
            .map(|(code, name, args)| {
                (
                    *code,
                    MethodSpec {
                        code: *code,
                        name: *name,
                        args: *args,
                    },
                )
            })
            .collect();
        Self {
            descriptors: HEYTAP_DESCRIPTORS,
            methods,
        }
    }

    /// Heytap table with ordinals read from the linked SDK's generated
    /// `$Stub` class. Falls back to the defaults when no stub constants
    /// are readable or they are inconsistent.
    pub fn heytap_from_stub<R: SdkRuntime + ?Sized>(runtime: &R) -> Self {
        let table = Self::heytap();
        for descriptor in HEYTAP_DESCRIPTORS {
            let stub = format!("{descriptor}$Stub");
            let overrides: Vec<(&str, u32)> = HEYTAP_METHODS
                .iter()
                .filter_map(|(_, name, _)| {
                    let field = format!("TRANSACTION_{name}");
                    match runtime.static_int(&stub, &field) {
                        Ok(Some(code)) => u32::try_from(code).ok().map(|c| (*name, c)),
                        Ok(None) => None,
                        Err(e) => {
                            debug!(%stub, %field, error = %e, "stub constant unreadable");
                            None
                        }
                    }
                })
                .collect();
            if overrides.is_empty() {
                continue;
            }
            return match table.clone().with_codes(&overrides) {
                Ok(read) => {
                    debug!(%stub, count = overrides.len(), "transaction ordinals read from SDK");
                    read
                }
                Err(e) => {
                    warn!(%stub, error = %e, "SDK ordinals rejected, keeping defaults");
                    table
                }
            };
        }
        table
    }

    /// Reassign ordinals by method name. Fails when two methods would end
    /// up sharing one ordinal.
    pub fn with_codes(self, overrides: &[(&str, u32)]) -> Result<Self> {
        let mut methods = BTreeMap::new();
        for spec in self.methods.into_values() {
            let code = overrides
                .iter()
                .find(|(name, _)| *name == spec.name)
                .map_or(spec.code, |(_, code)| *code);
            let name = spec.name;
            if let Some(clash) = methods.insert(code, MethodSpec { code, ..spec }) {
                return Err(PushError::InvalidArguments(format!(
                    "transaction code {code} assigned to both {} and {name}",
                    clash.name
                )));
            }
        }
        Ok(Self {
            descriptors: self.descriptors,
            methods,
        })
    }

    pub fn method(&self, code: u32) -> Option<&MethodSpec> {
        self.methods.get(&code)
    }

    /// Decode a transaction into method name and positional arguments.
    pub fn decode(&self, code: u32, parcel: &[u8]) -> Result<(String, Vec<ArgValue>)> {
        let spec = self.method(code).ok_or_else(|| {
            PushError::InvalidArguments(format!("unknown transaction code {code}"))
        })?;
        let mut reader = ParcelReader::new(parcel);
        reader.enforce_interface(self.descriptors)?;
        let mut args = Vec::with_capacity(spec.args.len());
        for kind in spec.args {
            let v = match kind {
                ArgKind::Int => ArgValue::Int(i64::from(reader.read_i32()?)),
                ArgKind::Str => ArgValue::Str(reader.read_string16()?),
            };
            args.push(v);
        }
        Ok((spec.name.to_owned(), args))
    }
}
