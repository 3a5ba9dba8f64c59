/* ************************************************************************
*   File: modify.rs                                       Part of TideMUD *
*  Usage: The socket pager and the pushed line editor                     *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use std::rc::Rc;

use crate::config::NUM_LINES_PER_PAGE;
use crate::db::DB;
use crate::depot::DepotId;
use crate::interpreter::InputHandler;
use crate::{DescriptorData, Game};

/* ******************************************************************
*  pagination                                                       *
****************************************************************** */

/// Pages in a text block, by counted newlines.
pub fn count_pages(text: &str) -> usize {
    let newlines = text.matches('\n').count();
    newlines / NUM_LINES_PER_PAGE + usize::from(newlines % NUM_LINES_PER_PAGE != 0)
}

/* byte range of one page, 1-based */
fn page_slice(text: &str, page: usize) -> &str {
    let skip = (page - 1) * NUM_LINES_PER_PAGE;
    let mut start = 0;
    let mut end = text.len();
    let mut newlines = 0;
    for (i, b) in text.bytes().enumerate() {
        if b != b'\n' {
            continue;
        }
        newlines += 1;
        if newlines == skip {
            start = i + 1;
        }
        if newlines == skip + NUM_LINES_PER_PAGE {
            end = i + 1;
            break;
        }
    }
    &text[start..end]
}

fn show_page(desc: &mut DescriptorData, page: usize) {
    let text = match desc.page_text.clone() {
        Some(t) => t,
        None => return,
    };
    desc.write_to_output(page_slice(&text, page));
    desc.write_to_output(&format!(
        "[ page {} of {}: MORE to continue, BACK to go back ]\r\n",
        page, desc.total_pages
    ));
}

/// Hand the connection an arbitrarily long text block.  Only one page is
/// ever materialized into the output buffer at a time; short texts bypass
/// the pager entirely.
pub fn page_string(desc: &mut DescriptorData, text: &str) {
    if text.is_empty() {
        return;
    }
    let pages = count_pages(text);
    if pages <= 1 {
        desc.write_to_output(text);
        desc.page_text = None;
        desc.total_pages = 0;
        desc.curr_page = 0;
        return;
    }
    desc.page_text = Some(Rc::from(text));
    desc.total_pages = pages;
    desc.curr_page = 1;
    show_page(desc, 1);
}

/// Advance the page cursor.  Past the last page the cursor stays put and
/// the reader is told there is nothing further.
pub fn page_continue(desc: &mut DescriptorData) {
    if desc.total_pages == 0 {
        desc.write_to_output("You are not reading anything.\r\n");
        return;
    }
    if desc.curr_page >= desc.total_pages {
        desc.write_to_output("There is no more text in your page buffer.\r\n");
        return;
    }
    desc.curr_page += 1;
    let page = desc.curr_page;
    show_page(desc, page);
}

/// Step the page cursor back, with the same bounds behavior.
pub fn page_back(desc: &mut DescriptorData) {
    if desc.total_pages == 0 {
        desc.write_to_output("You are not reading anything.\r\n");
        return;
    }
    if desc.curr_page <= 1 {
        desc.write_to_output("There is no more text in your page buffer.\r\n");
        return;
    }
    desc.curr_page -= 1;
    let page = desc.curr_page;
    show_page(desc, page);
}

/* ******************************************************************
*  line editor                                                      *
****************************************************************** */

pub type EditorDone = fn(&mut Game, &mut DB, DepotId, String);

/// A line editor pushed atop the playing handler.  Lines accumulate until
/// `@` alone on a line commits the text and pops back to the mode beneath.
pub struct TextEditor {
    lines: Vec<String>,
    max_len: usize,
    on_done: EditorDone,
}

impl TextEditor {
    pub fn new(max_len: usize, on_done: EditorDone) -> TextEditor {
        TextEditor {
            lines: vec![],
            max_len,
            on_done,
        }
    }

    fn total_len(&self) -> usize {
        self.lines.iter().map(|l| l.len() + 1).sum()
    }
}

impl InputHandler for TextEditor {
    fn on_input(&mut self, game: &mut Game, db: &mut DB, d_id: DepotId, input: &str) {
        let line = input.trim_end();
        if line == "@" {
            let mut text = String::new();
            for l in &self.lines {
                text.push_str(l);
                text.push('\n');
            }
            (self.on_done)(game, db, d_id, text);
            game.desc_mut(d_id).pop_input_handler();
            return;
        }
        if self.total_len() + line.len() + 1 > self.max_len {
            game.desc_mut(d_id)
                .write_to_output("Text too long.  Last line skipped.\r\n");
            return;
        }
        self.lines.push(line.to_string());
    }

    fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
        "] ".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_of(lines: usize) -> String {
        let mut s = String::new();
        for i in 0..lines {
            s.push_str(&format!("line {}\n", i));
        }
        s
    }

    #[test]
    fn page_count_is_exact_on_page_boundaries() {
        for k in 1..4 {
            assert_eq!(count_pages(&block_of(k * NUM_LINES_PER_PAGE)), k);
        }
        assert_eq!(count_pages(&block_of(NUM_LINES_PER_PAGE + 1)), 2);
        assert_eq!(count_pages("no newline at all"), 0);
    }

    #[test]
    fn short_text_bypasses_the_pager() {
        let mut desc = DescriptorData::detached();
        page_string(&mut desc, "just a line\r\n");
        assert_eq!(desc.total_pages, 0);
        assert!(desc.output_string().contains("just a line"));
    }

    #[test]
    fn paging_past_either_end_leaves_the_cursor_alone() {
        let mut desc = DescriptorData::detached();
        page_string(&mut desc, &block_of(NUM_LINES_PER_PAGE * 2));
        assert_eq!(desc.total_pages, 2);
        assert_eq!(desc.curr_page, 1);

        page_back(&mut desc);
        assert_eq!(desc.curr_page, 1);
        assert!(desc.output_string().contains("no more text"));

        page_continue(&mut desc);
        assert_eq!(desc.curr_page, 2);
        page_continue(&mut desc);
        assert_eq!(desc.curr_page, 2);
    }

    #[test]
    fn each_page_holds_only_its_own_lines() {
        let mut desc = DescriptorData::detached();
        page_string(&mut desc, &block_of(NUM_LINES_PER_PAGE * 2));
        let first = desc.output_string();
        assert!(first.contains("line 0"));
        assert!(!first.contains(&format!("line {}", NUM_LINES_PER_PAGE)));

        desc.output.clear();
        page_continue(&mut desc);
        let second = desc.output_string();
        assert!(second.contains(&format!("line {}", NUM_LINES_PER_PAGE)));
        assert!(!second.contains("line 0\n"));
    }

    fn store_description(_game: &mut Game, db: &mut DB, d_id: DepotId, text: String) {
        let _ = d_id;
        /* single test char; find it by name */
        let chid = db.chars.ids()[0];
        db.ch_mut(chid).description = text;
    }

    #[test]
    fn editor_commits_on_terminator_and_pops() {
        let (mut game, mut db) = crate::test_context();
        let chid = db.create_char("Brine", "maris");
        let d_id = game.add_detached_descriptor();
        game.desc_mut(d_id).character = Some(chid);

        let mut editor = TextEditor::new(256, store_description);
        editor.on_input(&mut game, &mut db, d_id, "A face like old rope.");
        editor.on_input(&mut game, &mut db, d_id, "@");
        assert_eq!(db.ch(chid).description, "A face like old rope.\n");
        /* the editor asked to be popped */
        assert_eq!(game.desc(d_id).pending_stack_ops(), 1);
    }
}
