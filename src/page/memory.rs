//! In-memory document.
//!
//! [`MemoryPage`] implements [`Page`] over a node arena so the injector can
//! run without a browser: tests drive it, benches measure against it, and
//! simulations replay host behaviour (router re-renders, history calls,
//! visibility and touch events) through it.
//!
//! # Example
//!
//! ```ignore
//! use custom_tabs::{By, MemoryPage, Page};
//!
//! let page = MemoryPage::with_body(
//!     r#"<div class="emby-tabs-slider"><button>Home</button></div>"#,
//! );
//! let slider = page.query(&By::class("emby-tabs-slider")).unwrap();
//! assert_eq!(page.text_content(slider).as_deref(), Some("Home"));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::identifiers::NodeId;
use crate::navigation::HostEvent;

use super::markup::{self, Fragment};
use super::{By, ClickHandler, Page};

// ============================================================================
// Types
// ============================================================================

/// Script engine hook.
///
/// Called with the page and a script body each time a `script` element is
/// mounted. An `Err` is reported as an uncaught script exception.
pub type ScriptHook =
    Arc<dyn Fn(&MemoryPage, &str) -> std::result::Result<(), String> + Send + Sync>;

/// What a node is.
#[derive(Debug, Clone)]
enum NodeKind {
    /// Element with lowercase tag and attributes in insertion order.
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    /// Text node.
    Text(String),
}

/// Arena entry.
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<ClickHandler>,
}

impl Node {
    fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                attributes: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    fn text(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text(text.into()),
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn matches(&self, by: &By) -> bool {
        self.tag()
            .is_some_and(|tag| by.matches(tag, |name| self.attribute(name)))
    }
}

// ============================================================================
// Dom
// ============================================================================

/// Node arena rooted at `body`.
struct Dom {
    nodes: FxHashMap<NodeId, Node>,
    root: NodeId,
}

impl Dom {
    fn new() -> Self {
        let root = NodeId::generate();
        let mut nodes = FxHashMap::default();
        nodes.insert(root, Node::element("body"));
        Self { nodes, root }
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| Error::node_not_found(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| Error::node_not_found(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Vec<(String, String)>> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            NodeKind::Text(_) => Err(Error::page(format!("{id} is a text node"))),
        }
    }

    fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                return true;
            }
            current = self.nodes.get(&node_id).and_then(|node| node.parent);
        }
        false
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.nodes.get(&node_id).and_then(|n| n.parent);
        }
        false
    }

    /// Depth-first search below `root`, excluding `root` itself.
    fn find_below(&self, root: NodeId, by: &By) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self
            .nodes
            .get(&root)?
            .children
            .iter()
            .rev()
            .copied()
            .collect();

        while let Some(id) = stack.pop() {
            let node = self.nodes.get(&id)?;
            if node.matches(by) {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get_mut(&id).and_then(|node| node.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
    }

    /// Removes a node and its subtree from the arena.
    fn drop_subtree(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&node_id) {
                stack.extend(node.children);
            }
        }
    }

    fn clear_children(&mut self, id: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parent = None;
            }
            self.drop_subtree(child);
        }
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(child)?;
        let parent_node = self.node(parent)?;
        if parent_node.tag().is_none() {
            return Err(Error::page("cannot insert into a text node"));
        }
        if self.is_ancestor(child, parent) {
            return Err(Error::page("cannot insert a node into its own subtree"));
        }
        Ok(())
    }

    fn build(&mut self, fragment: Fragment, parent: NodeId) -> NodeId {
        let id = NodeId::generate();
        let (node, children) = match fragment {
            Fragment::Text(text) => (Node::text(text), Vec::new()),
            Fragment::Element {
                tag,
                attributes,
                children,
            } => (
                Node {
                    kind: NodeKind::Element { tag, attributes },
                    parent: None,
                    children: Vec::new(),
                    listeners: Vec::new(),
                },
                children,
            ),
        };
        self.nodes.insert(id, Node { parent: Some(parent), ..node });

        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.build(child, id))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = child_ids;
        }
        id
    }

    fn text_of(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.text_of(*child, out);
                }
            }
        }
    }

    fn serialize_children(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let raw = node.tag().is_some_and(markup::is_raw_text);
        for child in &node.children {
            self.serialize(*child, raw, out);
        }
    }

    fn serialize(&self, id: NodeId, raw_parent: bool, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) if raw_parent => out.push_str(text),
            NodeKind::Text(text) => out.push_str(&markup::escape_text(text)),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&markup::escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if markup::is_void(tag) {
                    return;
                }
                self.serialize_children(id, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /// Collects mounted script bodies in document order.
    fn scripts_in(&self, id: NodeId, out: &mut Vec<String>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if node.tag() == Some("script") {
            let mut body = String::new();
            self.text_of(id, &mut body);
            out.push(body);
            return;
        }
        for child in &node.children {
            self.scripts_in(*child, out);
        }
    }
}

// ============================================================================
// MemoryPage
// ============================================================================

/// In-memory host page.
///
/// Thread-safe. Listeners and the script hook always run after the internal
/// lock is released, so they may call back into the page.
pub struct MemoryPage {
    /// Document tree.
    dom: RwLock<Dom>,
    /// Current location hash.
    hash: RwLock<String>,
    /// Global API client, once the host has defined it.
    api_client: RwLock<Option<Arc<dyn ApiClient>>>,
    /// Document ready state.
    loading: AtomicBool,
    /// Hidden state for visibility events.
    hidden: AtomicBool,
    /// Script engine.
    script_hook: RwLock<Option<ScriptHook>>,
    /// Every script body mounted so far.
    executed_scripts: Mutex<Vec<String>>,
    /// Host event sink (a navigation watcher).
    events: RwLock<Option<mpsc::UnboundedSender<HostEvent>>>,
}

impl fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPage")
            .field("hash", &*self.hash.read())
            .field("nodes", &self.dom.read().nodes.len())
            .field("has_api_client", &self.api_client.read().is_some())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryPage - Constructors
// ============================================================================

impl MemoryPage {
    /// Creates an empty, fully loaded page on the root route.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dom: RwLock::new(Dom::new()),
            hash: RwLock::new(String::new()),
            api_client: RwLock::new(None),
            loading: AtomicBool::new(false),
            hidden: AtomicBool::new(false),
            script_hook: RwLock::new(None),
            executed_scripts: Mutex::new(Vec::new()),
            events: RwLock::new(None),
        }
    }

    /// Creates a page whose body holds `markup`.
    #[must_use]
    pub fn with_body(markup: &str) -> Self {
        let page = Self::new();
        page.set_body(markup);
        page
    }
}

// ============================================================================
// MemoryPage - Host Simulation
// ============================================================================

impl MemoryPage {
    /// Returns the body element.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.dom.read().root
    }

    /// Replaces the whole body, as the host router does on navigation.
    pub fn set_body(&self, markup: &str) {
        let root = self.body();
        if let Err(e) = self.set_inner_html(root, markup) {
            warn!(error = %e, "Failed to replace body");
        }
    }

    /// Removes a node and its subtree.
    pub fn remove(&self, node: NodeId) {
        self.dom.write().drop_subtree(node);
    }

    /// Defines the host's global API client.
    pub fn install_api_client(&self, client: Arc<dyn ApiClient>) {
        *self.api_client.write() = Some(client);
    }

    /// Removes the host's global API client.
    pub fn remove_api_client(&self) {
        *self.api_client.write() = None;
    }

    /// Sets the location hash without emitting any event.
    pub fn set_hash(&self, hash: impl Into<String>) {
        *self.hash.write() = hash.into();
    }

    /// Sets the document ready state.
    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }

    /// Returns the document hidden state.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    /// Installs the script engine.
    pub fn set_script_hook(&self, hook: ScriptHook) {
        *self.script_hook.write() = Some(hook);
    }

    /// Returns every script body mounted so far, in order.
    #[must_use]
    pub fn executed_scripts(&self) -> Vec<String> {
        self.executed_scripts.lock().clone()
    }

    /// Counts elements matching `by` in the document.
    #[must_use]
    pub fn count(&self, by: &By) -> usize {
        let dom = self.dom.read();
        let mut count = 0;
        let mut stack = vec![dom.root];
        while let Some(id) = stack.pop() {
            let Some(node) = dom.nodes.get(&id) else {
                continue;
            };
            if id != dom.root && node.matches(by) {
                count += 1;
            }
            stack.extend(node.children.iter().copied());
        }
        count
    }

    /// Returns the children of `node` that are elements.
    #[must_use]
    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        let dom = self.dom.read();
        dom.nodes
            .get(&node)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|child| dom.nodes.get(child).is_some_and(|c| c.tag().is_some()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the element's lowercase tag.
    #[must_use]
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.dom
            .read()
            .nodes
            .get(&node)
            .and_then(|n| n.tag().map(str::to_string))
    }

    /// Serializes the whole body.
    #[must_use]
    pub fn body_html(&self) -> String {
        self.inner_html(self.body()).unwrap_or_default()
    }

    /// Dispatches a click on `node`, running its listeners in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] if the node does not exist.
    pub fn click(&self, node: NodeId) -> Result<()> {
        let listeners = self.dom.read().node(node)?.listeners.clone();
        debug!(node_id = %node, listeners = listeners.len(), "Dispatching click");
        for listener in listeners {
            listener();
        }
        Ok(())
    }

    /// Clicks the first element with the given `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Page`] if no such element exists.
    pub fn click_id(&self, id: &str) -> Result<()> {
        let node = self
            .query(&By::id(id))
            .ok_or_else(|| Error::page(format!("no element with id {id}")))?;
        self.click(node)
    }
}

// ============================================================================
// MemoryPage - Host Events
// ============================================================================

impl MemoryPage {
    /// Routes host events to a navigation watcher.
    pub fn connect_events(&self, sender: mpsc::UnboundedSender<HostEvent>) {
        *self.events.write() = Some(sender);
    }

    fn emit(&self, event: HostEvent) {
        let sender = self.events.read().clone();
        match sender {
            Some(sender) => {
                if sender.send(event).is_err() {
                    debug!(?event, "Host event dropped: watcher stopped");
                }
            }
            None => trace!(?event, "Host event dropped: no watcher connected"),
        }
    }

    /// `history.pushState` to a new hash.
    pub fn push_state(&self, hash: impl Into<String>) {
        self.set_hash(hash);
        self.emit(HostEvent::HistoryPushed);
    }

    /// `history.replaceState` to a new hash.
    pub fn replace_state(&self, hash: impl Into<String>) {
        self.set_hash(hash);
        self.emit(HostEvent::HistoryReplaced);
    }

    /// Back/forward navigation landing on `hash`.
    pub fn pop_state(&self, hash: impl Into<String>) {
        self.set_hash(hash);
        self.emit(HostEvent::PopState);
    }

    /// Page shown from the back/forward cache.
    pub fn page_show(&self) {
        self.emit(HostEvent::PageShow);
    }

    /// Window regains focus.
    pub fn focus(&self) {
        self.emit(HostEvent::Focus);
    }

    /// Document visibility change.
    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
        self.emit(HostEvent::VisibilityChanged { hidden });
    }

    /// Touch start anywhere in the document.
    pub fn touch_start(&self) {
        self.emit(HostEvent::TouchStart);
    }

    /// Touch end anywhere in the document.
    pub fn touch_end(&self) {
        self.emit(HostEvent::TouchEnd);
    }

    /// Document finished parsing.
    pub fn dom_content_loaded(&self) {
        self.set_loading(false);
        self.emit(HostEvent::DomContentLoaded);
    }
}

// ============================================================================
// MemoryPage - Script Mounting
// ============================================================================

impl MemoryPage {
    /// Runs every script inside `node` if it is now attached.
    fn run_mounted_scripts(&self, node: NodeId) -> Result<()> {
        let scripts = {
            let dom = self.dom.read();
            if !dom.is_attached(node) {
                return Ok(());
            }
            let mut scripts = Vec::new();
            dom.scripts_in(node, &mut scripts);
            scripts
        };

        let hook = self.script_hook.read().clone();
        let mut first_error = None;

        for body in scripts {
            debug!(script_len = body.len(), "Running mounted script");
            self.executed_scripts.lock().push(body.clone());

            if let Some(hook) = &hook
                && let Err(message) = hook(self, &body)
            {
                warn!(error = %message, "Mounted script threw");
                first_error.get_or_insert(Error::script(message));
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

// ============================================================================
// Page Implementation
// ============================================================================

impl Page for MemoryPage {
    fn location_hash(&self) -> String {
        self.hash.read().clone()
    }

    fn api_client(&self) -> Option<Arc<dyn ApiClient>> {
        self.api_client.read().clone()
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn query(&self, by: &By) -> Option<NodeId> {
        let dom = self.dom.read();
        dom.find_below(dom.root, by)
    }

    fn query_within(&self, root: NodeId, by: &By) -> Option<NodeId> {
        self.dom.read().find_below(root, by)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.dom.read().is_attached(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.read().nodes.get(&node).and_then(|n| n.parent)
    }

    fn create_element(&self, tag: &str) -> NodeId {
        let id = NodeId::generate();
        self.dom.write().nodes.insert(id, Node::element(tag));
        id
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let mut dom = self.dom.write();
        let attributes = dom.element_mut(node)?;
        let name = name.to_ascii_lowercase();
        match attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom
            .read()
            .nodes
            .get(&node)
            .and_then(|n| n.attribute(&name.to_ascii_lowercase()).map(str::to_string))
    }

    fn add_class(&self, node: NodeId, class: &str) -> Result<()> {
        let current = self.attribute(node, "class").unwrap_or_default();
        if current.split_ascii_whitespace().any(|c| c == class) {
            return Ok(());
        }
        let updated = if current.is_empty() {
            class.to_string()
        } else {
            format!("{current} {class}")
        };
        self.set_attribute(node, "class", &updated)
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) -> Result<()> {
        let current = self.attribute(node, "style").unwrap_or_default();
        let mut declarations: Vec<(String, String)> = current
            .split(';')
            .filter_map(|decl| {
                let (key, val) = decl.split_once(':')?;
                Some((key.trim().to_string(), val.trim().to_string()))
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();

        match declarations.iter_mut().find(|(key, _)| key == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => declarations.push((property.to_string(), value.to_string())),
        }

        let style = declarations
            .iter()
            .map(|(key, val)| format!("{key}: {val};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "style", &style)
    }

    fn set_text(&self, node: NodeId, text: &str) -> Result<()> {
        let mut dom = self.dom.write();
        dom.element_mut(node)?;
        dom.clear_children(node)?;
        if !text.is_empty() {
            let text_id = NodeId::generate();
            let mut text_node = Node::text(text);
            text_node.parent = Some(node);
            dom.nodes.insert(text_id, text_node);
            dom.node_mut(node)?.children.push(text_id);
        }
        Ok(())
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        let dom = self.dom.read();
        dom.nodes.get(&node)?;
        let mut out = String::new();
        dom.text_of(node, &mut out);
        Some(out)
    }

    fn set_inner_html(&self, node: NodeId, markup: &str) -> Result<()> {
        let fragments = markup::parse_fragment(markup);
        let mut dom = self.dom.write();
        if dom.node(node)?.tag().is_none() {
            return Err(Error::page("cannot set markup on a text node"));
        }
        dom.clear_children(node)?;

        let children: Vec<NodeId> = fragments
            .into_iter()
            .map(|fragment| dom.build(fragment, node))
            .collect();
        dom.node_mut(node)?.children = children;

        trace!(node_id = %node, markup_len = markup.len(), "Replaced inner markup");
        Ok(())
    }

    fn inner_html(&self, node: NodeId) -> Option<String> {
        let dom = self.dom.read();
        dom.nodes.get(&node)?;
        let mut out = String::new();
        dom.serialize_children(node, &mut out);
        Some(out)
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        {
            let mut dom = self.dom.write();
            dom.check_insertable(parent, child)?;
            dom.detach(child);
            dom.node_mut(child)?.parent = Some(parent);
            dom.node_mut(parent)?.children.push(child);
        }
        self.run_mounted_scripts(child)
    }

    fn insert_after(&self, reference: NodeId, node: NodeId) -> Result<()> {
        {
            let mut dom = self.dom.write();
            let parent = dom
                .node(reference)?
                .parent
                .ok_or_else(|| Error::page("reference node has no parent"))?;
            dom.check_insertable(parent, node)?;
            dom.detach(node);

            let siblings = &mut dom.node_mut(parent)?.children;
            let position = siblings
                .iter()
                .position(|sibling| *sibling == reference)
                .map_or(siblings.len(), |index| index + 1);
            siblings.insert(position, node);
            dom.node_mut(node)?.parent = Some(parent);
        }
        self.run_mounted_scripts(node)
    }

    fn remove_node(&self, node: NodeId) -> Result<()> {
        let mut dom = self.dom.write();
        dom.node(node)?;
        dom.drop_subtree(node);
        Ok(())
    }

    fn add_click_listener(&self, node: NodeId, handler: ClickHandler) -> Result<()> {
        self.dom.write().node_mut(node)?.listeners.push(handler);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
