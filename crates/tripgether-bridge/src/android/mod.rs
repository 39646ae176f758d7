// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android platform bridge via JNI.
//
// On Android the share target is an Activity inside the host app's own
// package, so the "shared namespace" is simply a SharedPreferences file named
// after the app-group identifier. Values are stored as JSON strings.
//
// Writes use `Editor.commit()` rather than `apply()`: the share Activity
// finishes right after queueing, and `commit()` is the only call that reports
// whether the write reached disk.

#![cfg(target_os = "android")]

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use jni::{JNIEnv, JavaVM};
use jni::objects::{JObject, JString, JValue};
use serde_json::Value;

use tripgether_core::error::{HandoffError, Result};
use tripgether_core::human_errors::HumanError;

use crate::share_intent::{ACTION_SEND_MULTIPLE, EXTRA_STREAM, EXTRA_TEXT, ShareIntent};
use crate::traits::*;

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// `Context.MODE_PRIVATE`.
const MODE_PRIVATE: i32 = 0;

/// `Intent.FLAG_ACTIVITY_NEW_TASK`.
const FLAG_ACTIVITY_NEW_TASK: i32 = 0x1000_0000;

static JAVA_VM: OnceLock<JavaVM> = OnceLock::new();

/// The process-wide `JavaVM`, resolved from the NDK context on first use.
fn java_vm() -> Result<&'static JavaVM> {
    if let Some(vm) = JAVA_VM.get() {
        return Ok(vm);
    }
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
    // The pointer is valid for the lifetime of the process.
    let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| HandoffError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
    Ok(JAVA_VM.get_or_init(|| vm))
}

/// Obtain a [`JNIEnv`] for the current thread, attaching it if needed.
fn jni_env() -> Result<JNIEnv<'static>> {
    java_vm()?
        .attach_current_thread_permanently()
        .map_err(|e| HandoffError::Bridge(format!("failed to attach JNI thread: {e}")))
}

/// Obtain the hosting `Activity` (a `Context`) as a [`JObject`].
fn activity() -> Result<JObject<'static>> {
    let ctx = ndk_context::android_context();
    let ptr = ctx.context();
    if ptr.is_null() {
        return Err(HandoffError::PlatformUnavailable);
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject for
    // the hosting Activity.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

fn jni_err(context: &str, e: jni::errors::Error) -> HandoffError {
    HandoffError::Bridge(format!("{context}: {e}"))
}

/// `context.getSharedPreferences(name, MODE_PRIVATE)`.
fn shared_preferences<'a>(env: &mut JNIEnv<'a>, name: &str) -> Result<JObject<'a>> {
    let activity = activity()?;
    let j_name: JString = env
        .new_string(name)
        .map_err(|e| jni_err("new_string(prefs name)", e))?;

    env.call_method(
        &activity,
        "getSharedPreferences",
        "(Ljava/lang/String;I)Landroid/content/SharedPreferences;",
        &[JValue::Object(&j_name), JValue::Int(MODE_PRIVATE)],
    )
    .map_err(|e| jni_err("getSharedPreferences", e))?
    .l()
    .map_err(|e| jni_err("getSharedPreferences->l", e))
}

/// Run `edit` against a fresh `SharedPreferences.Editor` and `commit()` it.
fn commit_edit<F>(name: &str, key: &str, edit: F) -> Result<()>
where
    F: for<'a> FnOnce(&mut JNIEnv<'a>, &JObject<'a>, &JString<'a>) -> Result<()>,
{
    let mut env = jni_env()?;
    let prefs = shared_preferences(&mut env, name)?;

    let editor: JObject = env
        .call_method(
            &prefs,
            "edit",
            "()Landroid/content/SharedPreferences$Editor;",
            &[],
        )
        .map_err(|e| jni_err("SharedPreferences.edit", e))?
        .l()
        .map_err(|e| jni_err("edit->l", e))?;

    let j_key: JString = env
        .new_string(key)
        .map_err(|e| jni_err("new_string(key)", e))?;

    edit(&mut env, &editor, &j_key)?;

    let committed = env
        .call_method(&editor, "commit", "()Z", &[])
        .map_err(|e| jni_err("editor.commit", e))?
        .z()
        .map_err(|e| jni_err("commit->z", e))?;

    if committed {
        Ok(())
    } else {
        Err(HandoffError::SyncFailed(format!(
            "SharedPreferences commit failed for {key}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Share intents
// ---------------------------------------------------------------------------

/// Copy a nullable `java.lang.String` into Rust.
fn java_string<'a>(env: &mut JNIEnv<'a>, obj: JObject<'a>) -> Result<Option<String>> {
    if obj.is_null() {
        return Ok(None);
    }
    let obj = JString::from(obj);
    let text: String = env
        .get_string(&obj)
        .map_err(|e| jni_err("get_string", e))?
        .into();
    Ok(Some(text))
}

/// `obj.toString()` for a nullable object.
fn object_to_string<'a>(env: &mut JNIEnv<'a>, obj: &JObject<'a>) -> Result<Option<String>> {
    if obj.is_null() {
        return Ok(None);
    }
    let text = env
        .call_method(obj, "toString", "()Ljava/lang/String;", &[])
        .map_err(|e| jni_err("toString", e))?
        .l()
        .map_err(|e| jni_err("toString->l", e))?;
    java_string(env, text)
}

/// Call a no-argument `String` getter on `obj`.
fn string_getter<'a>(env: &mut JNIEnv<'a>, obj: &JObject<'a>, method: &str) -> Result<Option<String>> {
    let value = env
        .call_method(obj, method, "()Ljava/lang/String;", &[])
        .map_err(|e| jni_err(method, e))?
        .l()
        .map_err(|e| jni_err(method, e))?;
    java_string(env, value)
}

/// Call `intent.<method>(key)` returning an object.
fn intent_extra<'a>(
    env: &mut JNIEnv<'a>,
    intent: &JObject<'a>,
    method: &str,
    sig: &str,
    key: &str,
) -> Result<JObject<'a>> {
    let j_key: JString = env
        .new_string(key)
        .map_err(|e| jni_err("new_string(extra key)", e))?;
    env.call_method(intent, method, sig, &[JValue::Object(&j_key)])
        .map_err(|e| jni_err(method, e))?
        .l()
        .map_err(|e| jni_err(method, e))
}

/// Copy the share payload out of an `android.content.Intent`.
pub fn share_intent<'a>(env: &mut JNIEnv<'a>, intent: &JObject<'a>) -> Result<ShareIntent> {
    let action = string_getter(env, intent, "getAction")?;
    let mime_type = string_getter(env, intent, "getType")?;

    let text = intent_extra(
        env,
        intent,
        "getStringExtra",
        "(Ljava/lang/String;)Ljava/lang/String;",
        EXTRA_TEXT,
    )?;
    let text = java_string(env, text)?;

    let mut streams = Vec::new();
    if action.as_deref() == Some(ACTION_SEND_MULTIPLE) {
        let list = intent_extra(
            env,
            intent,
            "getParcelableArrayListExtra",
            "(Ljava/lang/String;)Ljava/util/ArrayList;",
            EXTRA_STREAM,
        )?;
        if !list.is_null() {
            let size = env
                .call_method(&list, "size", "()I", &[])
                .map_err(|e| jni_err("ArrayList.size", e))?
                .i()
                .map_err(|e| jni_err("size->i", e))?;
            for index in 0..size {
                let uri = env
                    .call_method(&list, "get", "(I)Ljava/lang/Object;", &[JValue::Int(index)])
                    .map_err(|e| jni_err("ArrayList.get", e))?
                    .l()
                    .map_err(|e| jni_err("get->l", e))?;
                if let Some(uri) = object_to_string(env, &uri)? {
                    streams.push(uri);
                }
            }
        }
    } else {
        let uri = intent_extra(
            env,
            intent,
            "getParcelableExtra",
            "(Ljava/lang/String;)Landroid/os/Parcelable;",
            EXTRA_STREAM,
        )?;
        streams.extend(object_to_string(env, &uri)?);
    }

    Ok(ShareIntent {
        action,
        mime_type,
        text,
        streams,
    })
}

// ---------------------------------------------------------------------------
// SharedPreferencesStore
// ---------------------------------------------------------------------------

/// [`SharedStore`] backed by a named SharedPreferences file.
pub struct SharedPreferencesStore {
    namespace: String,
}

impl SharedPreferencesStore {
    pub fn open(namespace: &str) -> Result<Self> {
        if namespace.is_empty() || namespace.contains('/') {
            return Err(HandoffError::NamespaceUnavailable(namespace.to_string()));
        }
        // Touch the file so a missing Context surfaces here, not mid-share.
        let mut env = jni_env()?;
        shared_preferences(&mut env, namespace)?;
        Ok(Self {
            namespace: namespace.to_string(),
        })
    }
}

impl SharedStore for SharedPreferencesStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut env = jni_env()?;
        let prefs = shared_preferences(&mut env, &self.namespace)?;

        let j_key: JString = env
            .new_string(key)
            .map_err(|e| jni_err("new_string(key)", e))?;

        // prefs.getString(key, null)
        let raw: JObject = env
            .call_method(
                &prefs,
                "getString",
                "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;",
                &[JValue::Object(&j_key), JValue::Object(&JObject::null())],
            )
            .map_err(|e| jni_err("getString", e))?
            .l()
            .map_err(|e| jni_err("getString->l", e))?;

        if raw.is_null() {
            return Ok(None);
        }

        let raw = JString::from(raw);
        let text: String = env
            .get_string(&raw)
            .map_err(|e| jni_err("get_string(value)", e))?
            .into();

        // Foreign or corrupt entries read back as an unexpected shape.
        Ok(Some(serde_json::from_str(&text).unwrap_or(Value::Null)))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let text = serde_json::to_string(&value)?;
        commit_edit(&self.namespace, key, |env, editor, j_key| {
            let j_value: JString = env
                .new_string(&text)
                .map_err(|e| jni_err("new_string(value)", e))?;
            env.call_method(
                editor,
                "putString",
                "(Ljava/lang/String;Ljava/lang/String;)Landroid/content/SharedPreferences$Editor;",
                &[JValue::Object(j_key), JValue::Object(&j_value)],
            )
            .map_err(|e| jni_err("editor.putString", e))?;
            Ok(())
        })?;
        tracing::debug!(key, "Android: preference written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        commit_edit(&self.namespace, key, |env, editor, j_key| {
            env.call_method(
                editor,
                "remove",
                "(Ljava/lang/String;)Landroid/content/SharedPreferences$Editor;",
                &[JValue::Object(j_key)],
            )
            .map_err(|e| jni_err("editor.remove", e))?;
            Ok(())
        })
    }

    /// Every mutation already went through `commit()`.
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the platform bridge. Zero-sized; all state
/// lives on the Java side.
pub struct AndroidBridge;

impl AndroidBridge {
    /// Create a new Android bridge. No JNI call happens until a trait method
    /// is invoked.
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
}

impl NativeSharedStorage for AndroidBridge {
    fn open_shared_store(&self, namespace: &str) -> Result<Arc<dyn SharedStore>> {
        let store = SharedPreferencesStore::open(namespace)?;
        tracing::info!(namespace, "Android: shared preferences opened");
        Ok(Arc::new(store))
    }

    /// The app's private files directory; the share Activity runs in the
    /// same package.
    fn shared_container_dir(&self, namespace: &str) -> Result<PathBuf> {
        let mut env = jni_env()?;
        let activity = activity()?;

        let files_dir: JObject = env
            .call_method(&activity, "getFilesDir", "()Ljava/io/File;", &[])
            .map_err(|e| jni_err("getFilesDir", e))?
            .l()
            .map_err(|e| jni_err("getFilesDir->l", e))?;

        if files_dir.is_null() {
            return Err(HandoffError::NamespaceUnavailable(namespace.to_string()));
        }

        let path: JObject = env
            .call_method(&files_dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
            .map_err(|e| jni_err("getAbsolutePath", e))?
            .l()
            .map_err(|e| jni_err("getAbsolutePath->l", e))?;

        let path = JString::from(path);
        let path: String = env
            .get_string(&path)
            .map_err(|e| jni_err("get_string(path)", e))?
            .into();
        Ok(PathBuf::from(path))
    }
}

impl AndroidBridge {
    fn start_view_intent(&self, url: &str) -> Result<()> {
        let mut env = jni_env()?;
        let activity = activity()?;

        let j_url: JString = env
            .new_string(url)
            .map_err(|e| jni_err("new_string(url)", e))?;

        // Uri.parse(url)
        let uri: JObject = env
            .call_static_method(
                "android/net/Uri",
                "parse",
                "(Ljava/lang/String;)Landroid/net/Uri;",
                &[JValue::Object(&j_url)],
            )
            .map_err(|e| jni_err("Uri.parse", e))?
            .l()
            .map_err(|e| jni_err("parse->l", e))?;

        let j_action: JString = env
            .new_string("android.intent.action.VIEW")
            .map_err(|e| jni_err("new_string(ACTION_VIEW)", e))?;

        let intent: JObject = env
            .new_object(
                "android/content/Intent",
                "(Ljava/lang/String;Landroid/net/Uri;)V",
                &[JValue::Object(&j_action), JValue::Object(&uri)],
            )
            .map_err(|e| jni_err("new Intent(VIEW)", e))?;

        env.call_method(
            &intent,
            "addFlags",
            "(I)Landroid/content/Intent;",
            &[JValue::Int(FLAG_ACTIVITY_NEW_TASK)],
        )
        .map_err(|e| jni_err("addFlags", e))?;

        env.call_method(
            &activity,
            "startActivity",
            "(Landroid/content/Intent;)V",
            &[JValue::Object(&intent)],
        )
        .map_err(|e| jni_err("startActivity(view)", e))?;
        Ok(())
    }
}

impl AndroidBridge {
    /// Attachments of the share intent that started the hosting Activity.
    pub fn share_attachments(&self) -> Result<Vec<Box<dyn Attachment>>> {
        let mut env = jni_env()?;
        let activity = activity()?;

        let intent: JObject = env
            .call_method(&activity, "getIntent", "()Landroid/content/Intent;", &[])
            .map_err(|e| jni_err("getIntent", e))?
            .l()
            .map_err(|e| jni_err("getIntent->l", e))?;
        if intent.is_null() {
            return Ok(Vec::new());
        }

        let share = share_intent(&mut env, &intent)?;
        let action = share.action.clone();
        let attachments = share.into_attachments();
        let extractable = attachments
            .iter()
            .filter(|a| a.kinds().iter().any(|kind| kind.is_extractable()))
            .count();
        tracing::info!(
            action = ?action,
            attachments = attachments.len(),
            extractable,
            "Android: share intent received"
        );
        Ok(attachments)
    }
}

impl AppLauncher for AndroidBridge {
    fn open(&self, url: &str) -> bool {
        match self.start_view_intent(url) {
            Ok(()) => {
                tracing::info!(url, "Android: launch intent dispatched");
                true
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Android: launch intent failed");
                false
            }
        }
    }
}

impl ShareFeedback for AndroidBridge {
    // Toasts are shown by the Kotlin share Activity.
    fn share_saved(&self, item_count: usize) {
        tracing::info!(item_count, "Android: share saved");
    }

    fn configuration_error(&self, error: &HumanError) {
        tracing::error!(message = %error.message, suggestion = %error.suggestion, "Android: configuration error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_name() {
        let bridge = AndroidBridge::new();
        assert_eq!(bridge.platform_name(), "Android");
    }
}
