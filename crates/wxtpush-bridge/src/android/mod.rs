// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android platform bridge via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`.
//
// ## Architecture notes
//
// Device facts, type resolution, manifest meta-data and launcher badges are
// read directly through JNI.
//
// Vendor SDK calls go through a thin host-side shim class,
// `com.wxtpush.client.NativeBridge`, which owns the SDK listener objects
// (typed callbacks, dynamic proxies, Binder stubs, broadcast receivers).
// The shim forwards every callback into the `Java_com_wxtpush_client_
// NativeBridge_native*` exports at the bottom of this file, which hand them
// to the process-wide ingress.

#![cfg(target_os = "android")]

use std::collections::BTreeMap;
use std::sync::Arc;

use jni::objects::{JByteArray, JClass, JObject, JObjectArray, JString, JValue};
use jni::sys::{jboolean, jint, JNI_TRUE};
use jni::JNIEnv;
use serde_json::{Map, Value};

use wxtpush_core::error::{PushError, Result};
use wxtpush_core::{ArgValue, MessageKind, RawCallback, Vendor, VendorConfig};

use crate::ingress;
use crate::traits::*;

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Host shim that owns the vendor SDK listeners.
const SHIM_CLASS: &str = "com.wxtpush.client.NativeBridge";

/// `PackageManager.GET_META_DATA`.
const GET_META_DATA: jint = 128;

/// Obtain a [`JNIEnv`] handle from the global Android context.
fn jni_env() -> Result<JNIEnv<'static>> {
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
    // The pointer is valid for the lifetime of the process.
    let vm = unsafe { jni::JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| PushError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
    vm.attach_current_thread_permanently()
        .map_err(|e| PushError::Bridge(format!("failed to attach JNI thread: {e}")))
}

/// The application `Context` handed to the NDK glue.
fn app_context() -> Result<JObject<'static>> {
    let ctx = ndk_context::android_context();
    let ptr = ctx.context();
    if ptr.is_null() {
        return Err(PushError::Bridge(
            "Android context is null, native glue not initialised".into(),
        ));
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

fn jni_err(context: &str, e: jni::errors::Error) -> PushError {
    PushError::Bridge(format!("{context}: {e}"))
}

/// Load a class through the app's class loader. Threads attached from
/// native code only see system classes through `FindClass`.
fn load_class<'a>(env: &mut JNIEnv<'a>, context: &JObject, name: &str) -> Result<JClass<'a>> {
    let loader = env
        .call_method(context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .map_err(|e| jni_err("getClassLoader", e))?
        .l()
        .map_err(|e| jni_err("getClassLoader->l", e))?;
    let j_name = env
        .new_string(name)
        .map_err(|e| jni_err("new_string(class)", e))?;
    let class = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&j_name)],
        )
        .map_err(|e| jni_err("loadClass", e))?
        .l()
        .map_err(|e| jni_err("loadClass->l", e))?;
    Ok(JClass::from(class))
}

/// Read a possibly-null Java string.
fn opt_string(env: &mut JNIEnv, s: &JString) -> Option<String> {
    if s.is_null() {
        return None;
    }
    env.get_string(s).ok().map(String::from)
}

fn obj_to_string(env: &mut JNIEnv, obj: JObject) -> Result<Option<String>> {
    if obj.is_null() {
        return Ok(None);
    }
    let js = JString::from(obj);
    Ok(opt_string(env, &js))
}

fn package_name(env: &mut JNIEnv, context: &JObject) -> Result<String> {
    let pkg = env
        .call_method(context, "getPackageName", "()Ljava/lang/String;", &[])
        .map_err(|e| jni_err("getPackageName", e))?
        .l()
        .map_err(|e| jni_err("getPackageName->l", e))?;
    obj_to_string(env, pkg)?.ok_or_else(|| PushError::Bridge("package name is null".into()))
}

fn build_field(env: &mut JNIEnv, field: &str) -> Result<String> {
    let value = env
        .get_static_field("android/os/Build", field, "Ljava/lang/String;")
        .map_err(|e| jni_err("Build field", e))?
        .l()
        .map_err(|e| jni_err("Build field->l", e))?;
    Ok(obj_to_string(env, value)?.unwrap_or_default())
}

/// Turn a pending Java exception into a `PushError`, clearing it.
///
/// Vendor SDK exceptions carry a numeric status through `getStatusCode()`
/// (HMS) or `getErrorCode()` (Honor); those become `VendorProtocol`.
fn take_exception(env: &mut JNIEnv, vendor: Vendor, context: &str) -> PushError {
    let throwable = match env.exception_occurred() {
        Ok(t) if !t.is_null() => t,
        _ => return PushError::Bridge(format!("{context}: JNI call failed")),
    };
    let _ = env.exception_clear();

    let message = env
        .call_method(&throwable, "getMessage", "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .ok()
        .and_then(|o| obj_to_string(env, o).ok().flatten())
        .unwrap_or_else(|| "no message".into());
    let _ = env.exception_clear();

    for getter in ["getStatusCode", "getErrorCode"] {
        match env.call_method(&throwable, getter, "()I", &[]).and_then(|v| v.i()) {
            Ok(code) => {
                return PushError::VendorProtocol {
                    vendor,
                    code: i64::from(code),
                    reason: message,
                };
            }
            Err(_) => {
                let _ = env.exception_clear();
            }
        }
    }
    PushError::Bridge(format!("{context}: {message}"))
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the wxtpush platform bridge.
///
/// Zero-sized; all state lives on the Java side.
pub struct AndroidBridge;

impl AndroidBridge {
    /// Does not touch JNI; the first JNI call happens lazily.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }

    fn vendor_sdks(&self) -> Vec<Arc<dyn VendorSdk>> {
        [Vendor::Huawei, Vendor::Honor, Vendor::Xiaomi, Vendor::Oppo, Vendor::Vivo]
            .into_iter()
            .map(|vendor| Arc::new(ShimSdk { vendor }) as Arc<dyn VendorSdk>)
            .collect()
    }
}

impl SdkRuntime for AndroidBridge {
    fn resolve_type(&self, qualified_name: &str) -> Result<bool> {
        let mut env = jni_env()?;
        let context = app_context()?;
        match load_class(&mut env, &context, qualified_name) {
            Ok(_) => Ok(true),
            Err(_) => {
                // ClassNotFoundException is the expected "not linked" answer.
                let _ = env.exception_clear();
                tracing::debug!(class = qualified_name, "type not resolvable");
                Ok(false)
            }
        }
    }

    /// Reads generated constants such as a Binder stub's `TRANSACTION_*`
    /// ordinals.
    fn static_int(&self, qualified_name: &str, field: &str) -> Result<Option<i32>> {
        let mut env = jni_env()?;
        let context = app_context()?;
        let class = match load_class(&mut env, &context, qualified_name) {
            Ok(class) => class,
            Err(_) => {
                let _ = env.exception_clear();
                return Ok(None);
            }
        };
        match env.get_static_field(&class, field, "I").and_then(|v| v.i()) {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                // NoSuchFieldError: the SDK build lacks this method.
                let _ = env.exception_clear();
                tracing::debug!(class = qualified_name, field, "static int not found");
                Ok(None)
            }
        }
    }
}

impl DeviceIdentity for AndroidBridge {
    fn brand(&self) -> Result<String> {
        let mut env = jni_env()?;
        build_field(&mut env, "BRAND")
    }

    fn manufacturer(&self) -> Result<String> {
        let mut env = jni_env()?;
        build_field(&mut env, "MANUFACTURER")
    }

    /// `Settings.Secure.ANDROID_ID`, stable per app signing key and user.
    fn device_id(&self) -> Result<String> {
        let mut env = jni_env()?;
        let context = app_context()?;

        let resolver = env
            .call_method(
                &context,
                "getContentResolver",
                "()Landroid/content/ContentResolver;",
                &[],
            )
            .map_err(|e| jni_err("getContentResolver", e))?
            .l()
            .map_err(|e| jni_err("getContentResolver->l", e))?;
        let key = env
            .new_string("android_id")
            .map_err(|e| jni_err("new_string(android_id)", e))?;
        let id = env
            .call_static_method(
                "android/provider/Settings$Secure",
                "getString",
                "(Landroid/content/ContentResolver;Ljava/lang/String;)Ljava/lang/String;",
                &[JValue::Object(&resolver), JValue::Object(&key)],
            )
            .map_err(|e| jni_err("Settings.Secure.getString", e))?
            .l()
            .map_err(|e| jni_err("getString->l", e))?;

        obj_to_string(&mut env, id)?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PushError::Bridge("ANDROID_ID unavailable".into()))
    }
}

// ---------------------------------------------------------------------------
// NativeBadge: OEM launcher mechanisms
// ---------------------------------------------------------------------------

/// Launcher family, chosen by manufacturer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BadgeFamily {
    Huawei,
    Xiaomi,
    Oppo,
    Vivo,
    Samsung,
}

impl BadgeFamily {
    fn for_manufacturer(manufacturer: &str) -> Option<Self> {
        match manufacturer.to_ascii_uppercase().as_str() {
            "HUAWEI" | "HONOR" => Some(BadgeFamily::Huawei),
            "XIAOMI" | "REDMI" => Some(BadgeFamily::Xiaomi),
            "OPPO" => Some(BadgeFamily::Oppo),
            "VIVO" => Some(BadgeFamily::Vivo),
            "SAMSUNG" => Some(BadgeFamily::Samsung),
            _ => None,
        }
    }

    fn for_vendor(vendor: Vendor) -> Option<Self> {
        match vendor {
            Vendor::Huawei | Vendor::Honor => Some(BadgeFamily::Huawei),
            Vendor::Xiaomi => Some(BadgeFamily::Xiaomi),
            Vendor::Oppo => Some(BadgeFamily::Oppo),
            Vendor::Vivo => Some(BadgeFamily::Vivo),
            Vendor::Apple => None,
        }
    }
}

enum Extra<'a> {
    Str(&'a str),
    Int(i32),
}

fn send_broadcast(
    env: &mut JNIEnv,
    context: &JObject,
    action: &str,
    extras: &[(&str, Extra)],
) -> Result<()> {
    let j_action = env
        .new_string(action)
        .map_err(|e| jni_err("new_string(action)", e))?;
    let intent = env
        .new_object(
            "android/content/Intent",
            "(Ljava/lang/String;)V",
            &[JValue::Object(&j_action)],
        )
        .map_err(|e| jni_err("new Intent", e))?;

    for (key, value) in extras {
        let j_key = env
            .new_string(key)
            .map_err(|e| jni_err("new_string(extra key)", e))?;
        match value {
            Extra::Str(s) => {
                let j_val = env
                    .new_string(s)
                    .map_err(|e| jni_err("new_string(extra)", e))?;
                env.call_method(
                    &intent,
                    "putExtra",
                    "(Ljava/lang/String;Ljava/lang/String;)Landroid/content/Intent;",
                    &[JValue::Object(&j_key), JValue::Object(&j_val)],
                )
                .map_err(|e| jni_err("putExtra(String)", e))?;
            }
            Extra::Int(n) => {
                env.call_method(
                    &intent,
                    "putExtra",
                    "(Ljava/lang/String;I)Landroid/content/Intent;",
                    &[JValue::Object(&j_key), JValue::Int(*n)],
                )
                .map_err(|e| jni_err("putExtra(int)", e))?;
            }
        }
    }

    env.call_method(
        context,
        "sendBroadcast",
        "(Landroid/content/Intent;)V",
        &[JValue::Object(&intent)],
    )
    .map_err(|e| jni_err("sendBroadcast", e))?;
    Ok(())
}

/// Class name of the launcher activity, or empty when none is declared.
fn launcher_class(env: &mut JNIEnv, context: &JObject, package: &str) -> Result<String> {
    let pm = env
        .call_method(
            context,
            "getPackageManager",
            "()Landroid/content/pm/PackageManager;",
            &[],
        )
        .map_err(|e| jni_err("getPackageManager", e))?
        .l()
        .map_err(|e| jni_err("getPackageManager->l", e))?;
    let j_pkg = env
        .new_string(package)
        .map_err(|e| jni_err("new_string(package)", e))?;
    let intent = env
        .call_method(
            &pm,
            "getLaunchIntentForPackage",
            "(Ljava/lang/String;)Landroid/content/Intent;",
            &[JValue::Object(&j_pkg)],
        )
        .map_err(|e| jni_err("getLaunchIntentForPackage", e))?
        .l()
        .map_err(|e| jni_err("getLaunchIntentForPackage->l", e))?;
    if intent.is_null() {
        return Ok(String::new());
    }
    let component = env
        .call_method(&intent, "getComponent", "()Landroid/content/ComponentName;", &[])
        .map_err(|e| jni_err("getComponent", e))?
        .l()
        .map_err(|e| jni_err("getComponent->l", e))?;
    if component.is_null() {
        return Ok(String::new());
    }
    let name = env
        .call_method(&component, "getClassName", "()Ljava/lang/String;", &[])
        .map_err(|e| jni_err("getClassName", e))?
        .l()
        .map_err(|e| jni_err("getClassName->l", e))?;
    Ok(obj_to_string(env, name)?.unwrap_or_default())
}

/// Huawei/Honor launchers take the count through a content provider call.
fn set_huawei_badge(
    env: &mut JNIEnv,
    context: &JObject,
    package: &str,
    class: &str,
    count: i32,
) -> Result<()> {
    let bundle = env
        .new_object("android/os/Bundle", "()V", &[])
        .map_err(|e| jni_err("new Bundle", e))?;
    for (key, value) in [("package", package), ("class", class)] {
        let j_key = env.new_string(key).map_err(|e| jni_err("new_string", e))?;
        let j_val = env.new_string(value).map_err(|e| jni_err("new_string", e))?;
        env.call_method(
            &bundle,
            "putString",
            "(Ljava/lang/String;Ljava/lang/String;)V",
            &[JValue::Object(&j_key), JValue::Object(&j_val)],
        )
        .map_err(|e| jni_err("putString", e))?;
    }
    let j_count_key = env
        .new_string("badgenumber")
        .map_err(|e| jni_err("new_string", e))?;
    env.call_method(
        &bundle,
        "putInt",
        "(Ljava/lang/String;I)V",
        &[JValue::Object(&j_count_key), JValue::Int(count)],
    )
    .map_err(|e| jni_err("putInt", e))?;

    let j_uri = env
        .new_string("content://com.huawei.android.launcher.settings/badge/")
        .map_err(|e| jni_err("new_string(uri)", e))?;
    let uri = env
        .call_static_method(
            "android/net/Uri",
            "parse",
            "(Ljava/lang/String;)Landroid/net/Uri;",
            &[JValue::Object(&j_uri)],
        )
        .map_err(|e| jni_err("Uri.parse", e))?
        .l()
        .map_err(|e| jni_err("Uri.parse->l", e))?;
    let resolver = env
        .call_method(
            context,
            "getContentResolver",
            "()Landroid/content/ContentResolver;",
            &[],
        )
        .map_err(|e| jni_err("getContentResolver", e))?
        .l()
        .map_err(|e| jni_err("getContentResolver->l", e))?;
    let j_method = env
        .new_string("change_badge")
        .map_err(|e| jni_err("new_string(method)", e))?;
    env.call_method(
        &resolver,
        "call",
        "(Landroid/net/Uri;Ljava/lang/String;Ljava/lang/String;Landroid/os/Bundle;)Landroid/os/Bundle;",
        &[
            JValue::Object(&uri),
            JValue::Object(&j_method),
            JValue::Object(&JObject::null()),
            JValue::Object(&bundle),
        ],
    )
    .map_err(|e| jni_err("ContentResolver.call(change_badge)", e))?;
    Ok(())
}

impl NativeBadge for AndroidBridge {
    fn set_badge(&self, count: u32, vendor: Option<Vendor>) -> Result<()> {
        let mut env = jni_env()?;
        let context = app_context()?;
        let manufacturer = build_field(&mut env, "MANUFACTURER")?;

        let family = BadgeFamily::for_manufacturer(&manufacturer)
            .or_else(|| vendor.and_then(BadgeFamily::for_vendor))
            .ok_or_else(|| {
                tracing::warn!(%manufacturer, "no badge mechanism for this launcher");
                PushError::PlatformUnavailable
            })?;

        let package = package_name(&mut env, &context)?;
        let class = launcher_class(&mut env, &context, &package)?;
        let n = i32::try_from(count).unwrap_or(i32::MAX);
        tracing::info!(?family, count, "Android: setting launcher badge");

        match family {
            BadgeFamily::Huawei => set_huawei_badge(&mut env, &context, &package, &class, n),
            BadgeFamily::Xiaomi => {
                let component = format!("{package}/{class}");
                let text = if n > 0 { n.to_string() } else { String::new() };
                send_broadcast(
                    &mut env,
                    &context,
                    "android.intent.action.APPLICATION_MESSAGE_UPDATE",
                    &[
                        (
                            "android.intent.extra.update_application_component_name",
                            Extra::Str(&component),
                        ),
                        (
                            "android.intent.extra.update_application_message_text",
                            Extra::Str(&text),
                        ),
                    ],
                )
            }
            BadgeFamily::Oppo => send_broadcast(
                &mut env,
                &context,
                "com.oppo.unsettledevent",
                &[
                    ("pakeageName", Extra::Str(&package)),
                    ("number", Extra::Int(n)),
                    ("upgradeNumber", Extra::Int(n)),
                ],
            ),
            BadgeFamily::Vivo => send_broadcast(
                &mut env,
                &context,
                "launcher.action.CHANGE_APPLICATION_NOTIFICATION_NUM",
                &[
                    ("packageName", Extra::Str(&package)),
                    ("className", Extra::Str(&class)),
                    ("notificationNum", Extra::Int(n)),
                ],
            ),
            BadgeFamily::Samsung => send_broadcast(
                &mut env,
                &context,
                "android.intent.action.BADGE_COUNT_UPDATE",
                &[
                    ("badge_count", Extra::Int(n)),
                    ("badge_count_package_name", Extra::Str(&package)),
                    ("badge_count_class_name", Extra::Str(&class)),
                ],
            ),
        }
    }

    /// Launchers do not expose the badge count.
    fn read_badge(&self) -> Result<Option<u32>> {
        Ok(None)
    }
}

impl NativeManifest for AndroidBridge {
    fn manifest_meta(&self) -> Result<BTreeMap<String, String>> {
        let mut env = jni_env()?;
        let context = app_context()?;
        let package = package_name(&mut env, &context)?;

        let pm = env
            .call_method(
                &context,
                "getPackageManager",
                "()Landroid/content/pm/PackageManager;",
                &[],
            )
            .map_err(|e| jni_err("getPackageManager", e))?
            .l()
            .map_err(|e| jni_err("getPackageManager->l", e))?;
        let j_pkg = env
            .new_string(&package)
            .map_err(|e| jni_err("new_string(package)", e))?;
        let info = env
            .call_method(
                &pm,
                "getApplicationInfo",
                "(Ljava/lang/String;I)Landroid/content/pm/ApplicationInfo;",
                &[JValue::Object(&j_pkg), JValue::Int(GET_META_DATA)],
            )
            .map_err(|e| jni_err("getApplicationInfo", e))?
            .l()
            .map_err(|e| jni_err("getApplicationInfo->l", e))?;
        let bundle = env
            .get_field(&info, "metaData", "Landroid/os/Bundle;")
            .map_err(|e| jni_err("ApplicationInfo.metaData", e))?
            .l()
            .map_err(|e| jni_err("metaData->l", e))?;

        let mut out = BTreeMap::new();
        if bundle.is_null() {
            return Ok(out);
        }

        let keys = env
            .call_method(&bundle, "keySet", "()Ljava/util/Set;", &[])
            .map_err(|e| jni_err("keySet", e))?
            .l()
            .map_err(|e| jni_err("keySet->l", e))?;
        let array = env
            .call_method(&keys, "toArray", "()[Ljava/lang/Object;", &[])
            .map_err(|e| jni_err("toArray", e))?
            .l()
            .map_err(|e| jni_err("toArray->l", e))?;
        let array = JObjectArray::from(array);
        let len = env
            .get_array_length(&array)
            .map_err(|e| jni_err("get_array_length", e))?;

        for i in 0..len {
            let key_obj = env
                .get_object_array_element(&array, i)
                .map_err(|e| jni_err("get_object_array_element", e))?;
            let value = env
                .call_method(
                    &bundle,
                    "get",
                    "(Ljava/lang/String;)Ljava/lang/Object;",
                    &[JValue::Object(&key_obj)],
                )
                .map_err(|e| jni_err("Bundle.get", e))?
                .l()
                .map_err(|e| jni_err("Bundle.get->l", e))?;
            // Integer-typed meta-data (e.g. numeric app ids) is stringified.
            let text = env
                .call_static_method(
                    "java/lang/String",
                    "valueOf",
                    "(Ljava/lang/Object;)Ljava/lang/String;",
                    &[JValue::Object(&value)],
                )
                .map_err(|e| jni_err("String.valueOf", e))?
                .l()
                .map_err(|e| jni_err("valueOf->l", e))?;
            if let (Some(k), Some(v)) = (
                obj_to_string(&mut env, key_obj)?,
                obj_to_string(&mut env, text)?,
            ) {
                out.insert(k, v);
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Vendor SDK adapter via the host shim
// ---------------------------------------------------------------------------

/// Calls one vendor's SDK through `com.wxtpush.client.NativeBridge`.
struct ShimSdk {
    vendor: Vendor,
}

impl ShimSdk {
    /// Call a static shim method taking `(Context, String vendor, ...)` and
    /// returning a nullable string.
    fn call_string(&self, method: &str, extra: &[Option<&str>]) -> Result<Option<String>> {
        let mut env = jni_env()?;
        let context = app_context()?;
        let class = load_class(&mut env, &context, SHIM_CLASS)?;

        let j_vendor = env
            .new_string(self.vendor.id())
            .map_err(|e| jni_err("new_string(vendor)", e))?;
        let mut owned = Vec::with_capacity(extra.len());
        for arg in extra {
            let obj = match arg {
                Some(s) => JObject::from(env.new_string(s).map_err(|e| jni_err("new_string", e))?),
                None => JObject::null(),
            };
            owned.push(obj);
        }

        let mut sig = String::from("(Landroid/content/Context;Ljava/lang/String;");
        for _ in extra {
            sig.push_str("Ljava/lang/String;");
        }
        sig.push_str(")Ljava/lang/String;");

        let mut args = vec![JValue::Object(&context), JValue::Object(&j_vendor)];
        args.extend(owned.iter().map(JValue::Object));

        match env.call_static_method(&class, method, &sig, &args) {
            Ok(value) => {
                let obj = value.l().map_err(|e| jni_err("shim->l", e))?;
                obj_to_string(&mut env, obj)
            }
            Err(_) => Err(take_exception(&mut env, self.vendor, method)),
        }
    }

    fn call_void(&self, method: &str, sig_tail: &str, arg: JValue) -> Result<()> {
        let mut env = jni_env()?;
        let context = app_context()?;
        let class = load_class(&mut env, &context, SHIM_CLASS)?;
        let j_vendor = env
            .new_string(self.vendor.id())
            .map_err(|e| jni_err("new_string(vendor)", e))?;
        let sig = format!("(Landroid/content/Context;Ljava/lang/String;{sig_tail})V");
        env.call_static_method(
            &class,
            method,
            &sig,
            &[JValue::Object(&context), JValue::Object(&j_vendor), arg],
        )
        .map(|_| ())
        .map_err(|_| take_exception(&mut env, self.vendor, method))
    }
}

impl VendorSdk for ShimSdk {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn init(&self, config: &VendorConfig) -> Result<()> {
        self.call_string(
            "init",
            &[
                config.app_id.as_deref(),
                config.app_key.as_deref(),
                config.app_secret.as_deref(),
            ],
        )
        .map(|_| ())
    }

    fn register(
        &self,
        _config: &VendorConfig,
        scope: Option<&str>,
        sink: CallbackSink,
    ) -> Result<RegisterOutcome> {
        // Shim callbacks arrive through the process-wide ingress; make sure
        // it points at this registration before the call.
        if !ingress::is_installed() {
            ingress::install(sink);
        }
        match self.call_string("register", &[scope])? {
            Some(token) if !token.is_empty() => Ok(RegisterOutcome::Token(token)),
            _ => Ok(RegisterOutcome::Pending),
        }
    }

    fn current_token(&self) -> Result<Option<String>> {
        Ok(self
            .call_string("currentToken", &[])?
            .filter(|t| !t.is_empty()))
    }

    fn nudge(&self, action: NudgeAction) -> Result<Option<String>> {
        let name = match action {
            NudgeAction::Register => "register",
            NudgeAction::QueryToken => "queryToken",
        };
        Ok(self.call_string("nudge", &[Some(name)])?.filter(|t| !t.is_empty()))
    }

    fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.call_void("setNotificationsEnabled", "Z", JValue::Bool(u8::from(enabled)))
    }

    fn set_alias(&self, alias: &str) -> Result<()> {
        if self.vendor != Vendor::Xiaomi {
            return Err(PushError::Unsupported {
                vendor: self.vendor,
                operation: "setAlias",
            });
        }
        self.call_string("setAlias", &[Some(alias)]).map(|_| ())
    }

    fn set_tags(&self, tags: &[String]) -> Result<()> {
        if self.vendor != Vendor::Xiaomi {
            return Err(PushError::Unsupported {
                vendor: self.vendor,
                operation: "setTags",
            });
        }
        // Joined with newlines; tags never contain one.
        let joined = tags.join("\n");
        self.call_string("setTags", &[Some(&joined)]).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Native callback exports (called by the host shim)
// ---------------------------------------------------------------------------

fn parse_vendor(env: &mut JNIEnv, vendor: &JString) -> Option<Vendor> {
    let id = opt_string(env, vendor)?;
    match Vendor::parse(&id) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "native callback for unknown vendor");
            None
        }
    }
}

fn parse_object(env: &mut JNIEnv, json: &JString) -> Map<String, Value> {
    opt_string(env, json)
        .and_then(|s| serde_json::from_str::<Map<String, Value>>(&s).ok())
        .unwrap_or_default()
}

fn parse_args(env: &mut JNIEnv, json: &JString) -> Vec<ArgValue> {
    opt_string(env, json)
        .and_then(|s| serde_json::from_str::<Vec<ArgValue>>(&s).ok())
        .unwrap_or_default()
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_wxtpush_client_NativeBridge_nativeToken<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vendor: JString<'local>,
    token: JString<'local>,
) {
    if let Some(vendor) = parse_vendor(&mut env, &vendor) {
        let token = opt_string(&mut env, &token);
        ingress::deliver(RawCallback::Direct { vendor, token });
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_wxtpush_client_NativeBridge_nativeSuccess<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vendor: JString<'local>,
    value: JString<'local>,
) {
    if let Some(vendor) = parse_vendor(&mut env, &vendor) {
        let value = opt_string(&mut env, &value);
        ingress::deliver(RawCallback::Success { vendor, value });
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_wxtpush_client_NativeBridge_nativeFailure<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vendor: JString<'local>,
    code: jint,
    message: JString<'local>,
) {
    if let Some(vendor) = parse_vendor(&mut env, &vendor) {
        let message = opt_string(&mut env, &message).unwrap_or_default();
        ingress::deliver(RawCallback::Failure {
            vendor,
            code: i64::from(code),
            message,
        });
    }
}

/// Method intercepted on a dynamic proxy; arguments as a JSON array.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_wxtpush_client_NativeBridge_nativeInvocation<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vendor: JString<'local>,
    method: JString<'local>,
    args_json: JString<'local>,
) {
    if let Some(vendor) = parse_vendor(&mut env, &vendor) {
        let Some(method) = opt_string(&mut env, &method) else {
            return;
        };
        let args = parse_args(&mut env, &args_json);
        ingress::deliver(RawCallback::Invocation {
            vendor,
            method,
            args,
        });
    }
}

/// Broadcast intent; `vendor` may be null for plugin relay actions.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_wxtpush_client_NativeBridge_nativeBroadcast<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vendor: JString<'local>,
    action: JString<'local>,
    extras_json: JString<'local>,
) {
    let vendor = if vendor.is_null() {
        None
    } else {
        parse_vendor(&mut env, &vendor)
    };
    let Some(action) = opt_string(&mut env, &action) else {
        return;
    };
    let extras = parse_object(&mut env, &extras_json);
    ingress::deliver(RawCallback::Broadcast {
        vendor,
        action,
        extras,
    });
}

/// Binder transaction forwarded from a stub's `onTransact`, with the data
/// parcel marshalled to bytes.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_wxtpush_client_NativeBridge_nativeTransact<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vendor: JString<'local>,
    code: jint,
    parcel: JByteArray<'local>,
) -> jboolean {
    let Some(vendor) = parse_vendor(&mut env, &vendor) else {
        return 0;
    };
    let Ok(code) = u32::try_from(code) else {
        return 0;
    };
    let parcel = match env.convert_byte_array(&parcel) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to copy transaction parcel");
            return 0;
        }
    };
    if ingress::deliver(RawCallback::Transaction {
        vendor,
        code,
        parcel,
    }) {
        JNI_TRUE
    } else {
        0
    }
}

/// Vendor message service callback; `kind` is `received`, `arrived` or
/// `clicked`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_wxtpush_client_NativeBridge_nativeMessage<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vendor: JString<'local>,
    kind: JString<'local>,
    payload_json: JString<'local>,
) {
    let Some(vendor) = parse_vendor(&mut env, &vendor) else {
        return;
    };
    let kind = match opt_string(&mut env, &kind).as_deref() {
        Some("clicked") => MessageKind::Clicked,
        Some("arrived") => MessageKind::Arrived,
        _ => MessageKind::Received,
    };
    let payload = parse_object(&mut env, &payload_json);
    ingress::deliver(RawCallback::Message {
        vendor,
        kind,
        payload,
    });
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_wxtpush_client_NativeBridge_nativePermission<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vendor: JString<'local>,
    granted: jboolean,
) {
    if let Some(vendor) = parse_vendor(&mut env, &vendor) {
        ingress::deliver(RawCallback::Permission {
            vendor,
            granted: granted != 0,
        });
    }
}
