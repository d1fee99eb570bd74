use super::Track;

/// Edit distance between `now_playing` and the track in either
/// "artist - name" or "name - artist" order, whichever is closer.
pub fn match_distance(now_playing: &str, track: &Track) -> usize {
    let input = now_playing.trim().to_lowercase();
    let name = track.name.trim().to_lowercase();
    let artist = track.first_artist().unwrap_or_default().trim().to_lowercase();

    let artist_first = format!("{} - {}", artist, name);
    let name_first = format!("{} - {}", name, artist);

    strsim::levenshtein(&artist_first, &input).min(strsim::levenshtein(&name_first, &input))
}

/// A hit is close enough to add without asking when the distance is at most
/// half the query length.
pub fn is_close_match(now_playing: &str, track: &Track) -> bool {
    let threshold = now_playing.trim().chars().count() / 2;
    match_distance(now_playing, track) <= threshold
}
