//! AndroidManifest.xml `<activity>` element surgery

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

/// `<activity ...> ... </activity>`, across lines, non-greedy.
/// Self-closing tags and `<activity-alias>` are not matched.
static ACTIVITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<activity(?:\s[^>]*[^/>])?\s*>.*?</activity>").expect("valid activity regex")
});

/// The first activity element, if any
pub fn first_activity(manifest: &str) -> Option<&str> {
    ACTIVITY.find(manifest).map(|m| m.as_str())
}

/// Replace every activity element with `block`, returning the count replaced
pub fn replace_activities(manifest: &str, block: &str) -> (String, usize) {
    let count = ACTIVITY.find_iter(manifest).count();
    (ACTIVITY.replace_all(manifest, NoExpand(block)).into_owned(), count)
}

/// Wrap every activity element that is not already commented out in `<!-- -->`
pub fn comment_activities(manifest: &str) -> (String, usize) {
    let mut out = String::with_capacity(manifest.len() + 16);
    let mut last = 0;
    let mut wrapped = 0;

    for m in ACTIVITY.find_iter(manifest) {
        out.push_str(&manifest[last..m.start()]);
        if inside_comment(manifest, m.start()) {
            out.push_str(m.as_str());
        } else {
            out.push_str("<!--\n");
            out.push_str(m.as_str());
            out.push_str("\n-->");
            wrapped += 1;
        }
        last = m.end();
    }
    out.push_str(&manifest[last..]);
    (out, wrapped)
}

/// Number of activity elements not inside an XML comment
pub fn live_activity_count(manifest: &str) -> usize {
    ACTIVITY
        .find_iter(manifest)
        .filter(|m| !inside_comment(manifest, m.start()))
        .count()
}

/// Whether `offset` falls between an opening `<!--` and its `-->`
fn inside_comment(src: &str, offset: usize) -> bool {
    let before = &src[..offset];
    match (before.rfind("<!--"), before.rfind("-->")) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
  <application>
    <activity android:name="com.unity3d.player.CustomActivity"
              android:exported="true">
      <intent-filter>
        <action android:name="android.intent.action.MAIN" />
      </intent-filter>
    </activity>
  </application>
</manifest>
"#;

    const NEW: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
  <application>
    <activity android:name="com.unity3d.player.UnityPlayerActivity">
      <meta-data android:name="unityplayer.UnityActivity" android:value="true" />
    </activity>
    <activity-alias android:name="Alias" android:targetActivity="X" />
  </application>
</manifest>
"#;

    #[test]
    fn test_first_activity() {
        let block = first_activity(OLD).unwrap();
        assert!(block.starts_with("<activity android:name=\"com.unity3d.player.CustomActivity\""));
        assert!(block.ends_with("</activity>"));
        assert!(block.contains("intent-filter"));
    }

    #[test]
    fn test_no_activity() {
        assert_eq!(first_activity("<manifest><application/></manifest>"), None);
    }

    #[test]
    fn test_self_closing_activity_is_not_matched() {
        let src = "<activity android:name=\"A\" />\n<activity android:name=\"B\">x</activity>";
        assert_eq!(
            first_activity(src),
            Some("<activity android:name=\"B\">x</activity>")
        );
    }

    #[test]
    fn test_replace_activities() {
        let block = first_activity(OLD).unwrap();
        let (merged, replaced) = replace_activities(NEW, block);

        assert_eq!(replaced, 1);
        assert!(merged.contains("CustomActivity"));
        assert!(!merged.contains("UnityPlayerActivity"));
        assert!(merged.contains("<activity-alias"));
    }

    #[test]
    fn test_replace_does_not_expand_dollar() {
        let (merged, _) =
            replace_activities("<activity>a</activity>", "<activity>$0 ${x}</activity>");
        assert_eq!(merged, "<activity>$0 ${x}</activity>");
    }

    #[test]
    fn test_comment_activities() {
        let (commented, wrapped) = comment_activities(NEW);

        assert_eq!(wrapped, 1);
        assert!(commented.contains("<!--\n<activity android:name=\"com.unity3d.player.UnityPlayerActivity\">"));
        assert!(commented.contains("</activity>\n-->"));
        assert_eq!(live_activity_count(&commented), 0);
    }

    #[test]
    fn test_comment_activities_is_idempotent() {
        let (once, _) = comment_activities(NEW);
        let (twice, wrapped) = comment_activities(&once);
        assert_eq!(wrapped, 0);
        assert_eq!(once, twice);
    }
}
