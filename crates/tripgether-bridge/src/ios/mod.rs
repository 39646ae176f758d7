// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS platform bridge via objc2.
//
// The shared namespace is an App Group. Both the Share Extension and the
// host app must carry the same `com.apple.security.application-groups`
// entitlement; without it `containerURLForSecurityApplicationGroupIdentifier:`
// returns nil, which is the only reliable signal that the group is missing
// (`-[NSUserDefaults initWithSuiteName:]` silently falls back to a
// process-local domain).
//
// Values are stored as native property lists (NSString / NSArray) so that
// data written by earlier Swift builds of the extension (`[[String]]` queue,
// `[String]` legacy slot) reads back unchanged.
//
// Share attachments arrive as `NSItemProvider`s whose loads complete on a
// Foundation queue; the completion block hands the result back over a
// oneshot channel.

#![cfg(target_os = "ios")]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use block2::RcBlock;
use futures::channel::oneshot;
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, Bool, NSObject};
use objc2::{AllocAnyThread, MainThreadMarker, msg_send};
use objc2_foundation::{
    NSArray, NSDictionary, NSError, NSExtensionContext, NSExtensionItem, NSFileManager,
    NSItemProvider, NSString, NSURL, NSUserDefaults,
};
use objc2_ui_kit::UIApplication;
use serde_json::Value;

use tripgether_core::error::{HandoffError, Result};
use tripgether_core::human_errors::HumanError;
use tripgether_core::types::ContentKind;

use crate::traits::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve the App Group container directory, or `None` when the process
/// lacks the entitlement.
fn group_container(namespace: &str) -> Option<PathBuf> {
    let group = NSString::from_str(namespace);
    let manager = NSFileManager::defaultManager();

    // SAFETY: containerURLForSecurityApplicationGroupIdentifier: takes an
    // NSString and returns a nullable NSURL. Thread-safe per Foundation docs.
    let url: Option<Retained<NSURL>> = unsafe {
        msg_send![&*manager, containerURLForSecurityApplicationGroupIdentifier: &*group]
    };

    // SAFETY: -[NSURL path] returns a nullable NSString.
    let path: Option<Retained<NSString>> = url.and_then(|u| unsafe { msg_send![&*u, path] });
    path.map(|p| PathBuf::from(p.to_string()))
}

/// Convert a JSON value into a property-list object.
///
/// Only strings and (nested) arrays of strings are stored by the hand-off.
fn value_to_object(value: &Value) -> Result<Retained<NSObject>> {
    match value {
        Value::String(s) => Ok(Retained::into_super(NSString::from_str(s))),
        Value::Array(items) => {
            let objects = items
                .iter()
                .map(value_to_object)
                .collect::<Result<Vec<_>>>()?;
            let array: Retained<NSArray<NSObject>> = NSArray::from_retained_slice(&objects);
            Ok(Retained::into_super(array))
        }
        other => Err(HandoffError::Store(format!(
            "NSUserDefaults value must be a string or array, got {other}"
        ))),
    }
}

/// Convert a property-list object back into JSON.
///
/// Anything other than NSString / NSArray becomes `Value::Null`, which the
/// queue reads as "unexpected shape".
fn object_to_value(object: &AnyObject) -> Value {
    if let Some(s) = object.downcast_ref::<NSString>() {
        return Value::String(s.to_string());
    }
    if let Some(array) = object.downcast_ref::<NSArray>() {
        return Value::Array(array.to_vec().iter().map(|o| object_to_value(o)).collect());
    }
    Value::Null
}

// ---------------------------------------------------------------------------
// UserDefaultsStore
// ---------------------------------------------------------------------------

/// [`SharedStore`] backed by `NSUserDefaults(suiteName:)`.
pub struct UserDefaultsStore {
    namespace: String,
    defaults: Retained<NSUserDefaults>,
}

// SAFETY: NSUserDefaults is documented as thread-safe; the handle is only
// used through its thread-safe accessors.
unsafe impl Send for UserDefaultsStore {}
// SAFETY: as above.
unsafe impl Sync for UserDefaultsStore {}

impl UserDefaultsStore {
    /// Open the defaults suite for `namespace`.
    pub fn open(namespace: &str) -> Result<Self> {
        let suite = NSString::from_str(namespace);

        // SAFETY: initWithSuiteName: is the designated initializer for
        // shared suites. Returns nil for reserved names (e.g. the app's own
        // bundle identifier).
        let defaults: Option<Retained<NSUserDefaults>> =
            unsafe { msg_send![NSUserDefaults::alloc(), initWithSuiteName: &*suite] };

        let defaults =
            defaults.ok_or_else(|| HandoffError::NamespaceUnavailable(namespace.to_string()))?;

        Ok(Self {
            namespace: namespace.to_string(),
            defaults,
        })
    }
}

impl SharedStore for UserDefaultsStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let ns_key = NSString::from_str(key);
        // SAFETY: objectForKey: returns a nullable autoreleased object which
        // msg_send! retains for us.
        let object: Option<Retained<AnyObject>> =
            unsafe { msg_send![&*self.defaults, objectForKey: &*ns_key] };
        Ok(object.map(|o| object_to_value(&o)))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let ns_key = NSString::from_str(key);
        let object = value_to_object(&value)?;
        // SAFETY: the object graph is NSString/NSArray only, which are valid
        // property-list types for setObject:forKey:.
        unsafe {
            let _: () = msg_send![&*self.defaults, setObject: &*object, forKey: &*ns_key];
        }
        tracing::debug!(key, "iOS: defaults value written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let ns_key = NSString::from_str(key);
        // SAFETY: removeObjectForKey: accepts any NSString key.
        unsafe {
            let _: () = msg_send![&*self.defaults, removeObjectForKey: &*ns_key];
        }
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        // SAFETY: synchronize returns BOOL and has no preconditions.
        let ok: Bool = unsafe { msg_send![&*self.defaults, synchronize] };
        if ok.as_bool() {
            Ok(())
        } else {
            Err(HandoffError::SyncFailed("NSUserDefaults synchronize returned NO".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// ItemProviderAttachment
// ---------------------------------------------------------------------------

/// Interpret what `loadItemForTypeIdentifier:` delivered for `kind`.
///
/// URLs arrive as `NSURL`, text as `NSString`; anything else is the wrong
/// type for the requested kind.
fn loaded_item(item: Option<&AnyObject>, error: Option<&NSError>, kind: ContentKind) -> Result<String> {
    if let Some(error) = error {
        return Err(HandoffError::Extraction(error.localizedDescription().to_string()));
    }
    let Some(item) = item else {
        return Err(HandoffError::Extraction(format!("no item for {kind}")));
    };

    let value = match kind {
        ContentKind::Url => item.downcast_ref::<NSURL>().and_then(|url| {
            // SAFETY: -[NSURL absoluteString] returns a nullable NSString.
            let text: Option<Retained<NSString>> = unsafe { msg_send![url, absoluteString] };
            text.map(|t| t.to_string())
        }),
        _ => item.downcast_ref::<NSString>().map(|text| text.to_string()),
    };

    value.ok_or_else(|| HandoffError::UnexpectedItemType {
        expected: kind.to_string(),
        actual: item.class().name().to_string_lossy().into_owned(),
    })
}

/// One `NSItemProvider` from the extension's input items.
pub struct ItemProviderAttachment {
    provider: Retained<NSItemProvider>,
}

// SAFETY: NSItemProvider is safe to query and load from any thread; results
// are delivered to the completion block on a queue of Foundation's choosing.
unsafe impl Send for ItemProviderAttachment {}
// SAFETY: as above.
unsafe impl Sync for ItemProviderAttachment {}

impl ItemProviderAttachment {
    pub fn new(provider: Retained<NSItemProvider>) -> Self {
        Self { provider }
    }

    fn conforms_to(&self, kind: ContentKind) -> bool {
        let identifier = NSString::from_str(kind.type_identifier());
        // SAFETY: hasItemConformingToTypeIdentifier: takes an NSString and
        // returns BOOL.
        let yes: Bool =
            unsafe { msg_send![&*self.provider, hasItemConformingToTypeIdentifier: &*identifier] };
        yes.as_bool()
    }

    /// Start loading `kind`; the result arrives on the returned channel.
    fn start_load(&self, kind: ContentKind) -> oneshot::Receiver<Result<String>> {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));

        let handler = RcBlock::new(move |item: *mut AnyObject, error: *mut NSError| {
            // SAFETY: both arguments are nullable objects kept alive by the
            // caller for the duration of the block.
            let result = unsafe { loaded_item(item.as_ref(), error.as_ref(), kind) };
            if let Some(tx) = tx.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(result);
            }
        });

        let identifier = NSString::from_str(kind.type_identifier());
        // SAFETY: loadItemForTypeIdentifier:options:completionHandler: copies
        // the block before returning. Nil options are permitted.
        unsafe {
            let _: () = msg_send![
                &*self.provider,
                loadItemForTypeIdentifier: &*identifier,
                options: std::ptr::null::<AnyObject>(),
                completionHandler: &*handler
            ];
        }
        rx
    }
}

#[async_trait]
impl Attachment for ItemProviderAttachment {
    /// Registered identifiers first, then any extractable kind the provider
    /// conforms to through a subtype.
    fn kinds(&self) -> Vec<ContentKind> {
        // SAFETY: registeredTypeIdentifiers returns a non-null
        // NSArray<NSString>.
        let registered: Retained<NSArray<NSString>> =
            unsafe { msg_send![&*self.provider, registeredTypeIdentifiers] };
        let mut kinds: Vec<ContentKind> = registered
            .to_vec()
            .iter()
            .filter_map(|identifier| ContentKind::from_type_identifier(&identifier.to_string()))
            .collect();

        for kind in ContentKind::EXTRACTION_PRIORITY {
            if !kinds.contains(&kind) && self.conforms_to(kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    async fn load(&self, kind: ContentKind) -> Result<String> {
        self.start_load(kind).await.map_err(|_| {
            HandoffError::Extraction(format!("{kind} load finished without a result"))
        })?
    }
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// iOS implementation of the platform bridge.
pub struct IosBridge;

impl IosBridge {
    /// Create a new iOS bridge instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for IosBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for IosBridge {
    fn platform_name(&self) -> &str {
        "iOS"
    }
}

impl NativeSharedStorage for IosBridge {
    fn open_shared_store(&self, namespace: &str) -> Result<Arc<dyn SharedStore>> {
        if group_container(namespace).is_none() {
            tracing::error!(namespace, "iOS: app group container unavailable");
            return Err(HandoffError::NamespaceUnavailable(namespace.to_string()));
        }
        let store = UserDefaultsStore::open(namespace)?;
        tracing::info!(namespace, "iOS: shared defaults suite opened");
        Ok(Arc::new(store))
    }

    fn shared_container_dir(&self, namespace: &str) -> Result<PathBuf> {
        group_container(namespace)
            .ok_or_else(|| HandoffError::NamespaceUnavailable(namespace.to_string()))
    }
}

impl IosBridge {
    /// Attachments of every input item of the extension's context, in item
    /// order.
    pub fn extension_attachments(&self, context: &NSExtensionContext) -> Vec<Box<dyn Attachment>> {
        // SAFETY: inputItems is a non-null NSArray, normally of
        // NSExtensionItem.
        let items: Retained<NSArray<AnyObject>> = unsafe { msg_send![context, inputItems] };

        let mut attachments: Vec<Box<dyn Attachment>> = Vec::new();
        for item in items.to_vec() {
            let Some(item) = item.downcast_ref::<NSExtensionItem>() else {
                tracing::warn!("iOS: input item is not an NSExtensionItem");
                continue;
            };
            // SAFETY: attachments is a nullable NSArray<NSItemProvider>.
            let providers: Option<Retained<NSArray<NSItemProvider>>> =
                unsafe { msg_send![item, attachments] };
            for provider in providers.map(|p| p.to_vec()).unwrap_or_default() {
                attachments.push(Box::new(ItemProviderAttachment::new(provider)));
            }
        }
        tracing::info!(attachments = attachments.len(), "iOS: share request received");
        attachments
    }
}

impl AppLauncher for IosBridge {
    /// Ask UIKit to open the host app's custom-scheme URL.
    ///
    /// Must run on the main thread. The request is fire-and-forget: `true`
    /// means it was handed to UIKit, not that the host app launched.
    fn open(&self, url: &str) -> bool {
        let Some(mtm) = MainThreadMarker::new() else {
            tracing::warn!(url, "iOS: AppLauncher::open called off the main thread");
            return false;
        };

        let ns_string = NSString::from_str(url);
        // SAFETY: URLWithString: returns nil for malformed input.
        let ns_url: Option<Retained<NSURL>> =
            unsafe { msg_send![NSURL::class(), URLWithString: &*ns_string] };
        let Some(ns_url) = ns_url else {
            tracing::warn!(url, "iOS: launch URL is malformed");
            return false;
        };

        let app = UIApplication::sharedApplication(mtm);
        let options = NSDictionary::new();
        // SAFETY: MainThreadMarker guarantees main-thread UIKit access. A nil
        // completion handler is permitted.
        unsafe {
            app.openURL_options_completionHandler(&ns_url, &options, None);
        }
        tracing::info!(url, "iOS: launch request dispatched");
        true
    }
}

impl ShareFeedback for IosBridge {
    // The local notification and alert themselves are presented by the
    // Swift extension target; the bridge reports what should be shown.
    fn share_saved(&self, item_count: usize) {
        tracing::info!(item_count, "iOS: share saved");
    }

    fn configuration_error(&self, error: &HumanError) {
        tracing::error!(message = %error.message, suggestion = %error.suggestion, "iOS: configuration error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_name() {
        let bridge = IosBridge::new();
        assert_eq!(bridge.platform_name(), "iOS");
    }

    #[test]
    fn property_list_conversion() {
        let value = serde_json::json!([["https://a.example", "https://b.example"]]);
        let object = value_to_object(&value).expect("convert");
        assert_eq!(object_to_value(&object), value);
    }

    #[test]
    fn numbers_are_rejected() {
        assert!(value_to_object(&serde_json::json!(42)).is_err());
    }

    // Store and container tests need a signed app with the app-group
    // entitlement and run in the Xcode test target.
}
